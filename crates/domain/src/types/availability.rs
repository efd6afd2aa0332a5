//! Working-hours policy, busy intervals and suggested slots.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MEETING_DURATION_MINUTES, DEFAULT_SLOT_GAP_MINUTES, MAX_MEETING_DURATION_MINUTES,
};
use crate::errors::{Result, SlotlineError};

/// Per-user scheduling policy. Times of day are local to `timezone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHoursPolicy {
    /// IANA timezone identifier, e.g. `America/New_York`.
    pub timezone: String,
    #[serde(with = "time_of_day")]
    pub start_time: NaiveTime,
    #[serde(with = "time_of_day")]
    pub end_time: NaiveTime,
    pub min_notice_hours: u32,
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
    #[serde(default = "default_gap")]
    pub slot_gap_minutes: u32,
}

fn default_duration() -> u32 {
    DEFAULT_MEETING_DURATION_MINUTES
}

fn default_gap() -> u32 {
    DEFAULT_SLOT_GAP_MINUTES
}

impl WorkingHoursPolicy {
    /// Check the invariants that do not need a timezone database.
    pub fn validate(&self) -> Result<()> {
        if self.timezone.trim().is_empty() {
            return Err(SlotlineError::validation("timezone", "must not be empty"));
        }
        if self.start_time >= self.end_time {
            return Err(SlotlineError::validation(
                "startTime",
                format!("must be before endTime ({} >= {})", self.start_time, self.end_time),
            ));
        }
        validate_duration(self.default_duration_minutes, "defaultDurationMinutes")?;
        Ok(())
    }

    /// Working hours in the shape returned to API callers.
    pub fn summary(&self) -> WorkingHours {
        WorkingHours {
            start: self.start_time.format("%H:%M").to_string(),
            end: self.end_time.format("%H:%M").to_string(),
            timezone: self.timezone.clone(),
        }
    }
}

/// Validate a meeting duration in minutes.
pub fn validate_duration(minutes: u32, field: &str) -> Result<()> {
    if minutes == 0 {
        return Err(SlotlineError::validation(field, "must be greater than zero"));
    }
    if minutes > MAX_MEETING_DURATION_MINUTES {
        return Err(SlotlineError::validation(
            field,
            format!("must be at most {MAX_MEETING_DURATION_MINUTES} minutes"),
        ));
    }
    Ok(())
}

/// A calendar block during which the user is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }
}

/// A suggested free window. Serialized as absolute ISO-8601 instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AvailabilitySlot {
    pub fn overlaps(&self, busy: &BusyInterval) -> bool {
        self.start < busy.end && busy.start < self.end
    }
}

/// Working hours as echoed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
    pub timezone: String,
}

/// Full answer to a slot-suggestion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySuggestion {
    pub slots: Vec<AvailabilitySlot>,
    pub working_hours: WorkingHours,
    pub min_notice_hours: u32,
}

/// `HH:MM` serde representation for times of day.
pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Accepts `HH:MM` or `HH:MM:SS`.
    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        let trimmed = raw.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|e| format!("invalid time of day '{trimmed}': {e}"))
    }
}
