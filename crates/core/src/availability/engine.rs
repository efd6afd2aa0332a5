//! Slot search over working hours and busy intervals.
//!
//! All instants are `DateTime<Utc>`. Working-day boundaries are resolved per
//! calendar date in the policy's timezone, so a DST shift inside the horizon
//! moves `day_start` by exactly the shift.

use std::cmp::max;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use slotline_domain::constants::{
    DEFAULT_HORIZON_DAYS, DEFAULT_MAX_SLOTS, SLOT_ROUNDING_MINUTES,
};
use slotline_domain::{
    validate_duration, AvailabilitySlot, BusyInterval, Result, SlotlineError, WorkingHoursPolicy,
};

/// Parameters of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSearch {
    pub duration_minutes: u32,
    pub max_slots: usize,
    pub horizon_days: u32,
}

impl SlotSearch {
    pub fn new(duration_minutes: u32) -> Self {
        Self { duration_minutes, max_slots: DEFAULT_MAX_SLOTS, horizon_days: DEFAULT_HORIZON_DAYS }
    }

    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }
}

/// Parse an IANA timezone identifier.
pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| SlotlineError::validation("timezone", format!("unknown IANA timezone '{raw}'")))
}

/// Suggest up to `search.max_slots` free slots, earliest first.
///
/// Returns fewer slots (possibly none) when the horizon runs out; that is
/// not an error.
pub fn suggest_slots(
    policy: &WorkingHoursPolicy,
    busy: &[BusyInterval],
    search: &SlotSearch,
    now: DateTime<Utc>,
) -> Result<Vec<AvailabilitySlot>> {
    policy.validate()?;
    validate_duration(search.duration_minutes, "durationMinutes")?;
    let tz = parse_timezone(&policy.timezone)?;

    let duration = Duration::minutes(i64::from(search.duration_minutes));
    let gap = Duration::minutes(i64::from(policy.slot_gap_minutes));
    let min_instant = now + Duration::hours(i64::from(policy.min_notice_hours));
    let max_instant = now + Duration::days(i64::from(search.horizon_days));

    let mut relevant: Vec<BusyInterval> = busy
        .iter()
        .copied()
        .filter(|b| b.start < b.end && b.end > min_instant && b.start < max_instant)
        .collect();
    relevant.sort_by_key(|b| b.start);

    let today = now.with_timezone(&tz).date_naive();
    let mut slots = Vec::with_capacity(search.max_slots);

    for offset in 0..search.horizon_days {
        if slots.len() >= search.max_slots {
            break;
        }
        let Some(date) = today.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };
        if is_weekend(date) {
            continue;
        }
        let Some((day_start, day_end)) = day_window(tz, date, policy) else {
            continue;
        };

        let mut cursor = round_up_to_slot_boundary(max(day_start, min_instant), tz);
        while cursor + duration <= day_end && slots.len() < search.max_slots {
            let candidate_end = cursor + duration;
            match first_conflict(&relevant, cursor, candidate_end) {
                None => {
                    slots.push(AvailabilitySlot { start: cursor, end: candidate_end });
                    cursor = candidate_end + gap;
                }
                Some(conflict) => {
                    let next = round_up_to_slot_boundary(conflict.end, tz);
                    cursor = if next > cursor {
                        next
                    } else {
                        cursor + Duration::minutes(SLOT_ROUNDING_MINUTES)
                    };
                }
            }
        }
    }

    Ok(slots)
}

/// Absolute start/end of the working window on `date` in `tz`.
///
/// `None` when the window is empty after resolving local times.
pub fn day_window(
    tz: Tz,
    date: NaiveDate,
    policy: &WorkingHoursPolicy,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = resolve_local(tz, date.and_time(policy.start_time))?;
    let end = resolve_local(tz, date.and_time(policy.end_time))?;
    (start < end).then_some((start, end))
}

/// Round up to the next local `SLOT_ROUNDING_MINUTES` boundary.
///
/// Rounding happens on local wall-clock time so zones with half- or
/// quarter-hour offsets still land on `:00`/`:30`.
pub fn round_up_to_slot_boundary(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let step = SLOT_ROUNDING_MINUTES * 60;
    let offset = i64::from(instant.with_timezone(&tz).offset().fix().local_minus_utc());
    let local = instant.timestamp() + offset;
    let remainder = local.rem_euclid(step);

    if remainder == 0 && instant.timestamp_subsec_nanos() == 0 {
        return instant;
    }

    let rounded = local - remainder + step - offset;
    DateTime::from_timestamp(rounded, 0).unwrap_or(instant)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Map a local wall-clock time to an instant. Ambiguous times (fall back)
/// take the earlier instant; skipped times (spring forward) move one hour
/// later.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|local| local.with_timezone(&Utc))
}

/// A candidate conflicts when it starts inside a busy interval, ends inside
/// one, or fully contains one.
fn conflicts(busy: &BusyInterval, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let starts_inside = busy.start <= start && start < busy.end;
    let ends_inside = busy.start < end && end <= busy.end;
    let contains = start <= busy.start && busy.end <= end;
    starts_inside || ends_inside || contains
}

fn first_conflict(
    busy: &[BusyInterval],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<BusyInterval> {
    busy.iter().find(|b| conflicts(b, start, end)).copied()
}
