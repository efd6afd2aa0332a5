//! Availability service - resolves policy, token and busy time, then runs the
//! slot search.

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use slotline_common::time::Clock;
use slotline_domain::{
    validate_duration, AvailabilitySuggestion, Provider, Result, WorkingHoursPolicy,
};
use tracing::{info, instrument};

use super::engine::{parse_timezone, suggest_slots, SlotSearch};
use super::ports::{CalendarProvider, PolicyRepository};
use crate::credentials::TokenLifecycleManager;

/// Suggests meeting slots for a user.
pub struct AvailabilityService {
    tokens: Arc<TokenLifecycleManager>,
    calendar: Arc<dyn CalendarProvider>,
    policies: Arc<dyn PolicyRepository>,
    default_policy: WorkingHoursPolicy,
    clock: Arc<dyn Clock>,
    max_slots: Option<usize>,
    horizon_days: Option<u32>,
}

impl AvailabilityService {
    pub fn new(
        tokens: Arc<TokenLifecycleManager>,
        calendar: Arc<dyn CalendarProvider>,
        policies: Arc<dyn PolicyRepository>,
        default_policy: WorkingHoursPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            calendar,
            policies,
            default_policy,
            clock,
            max_slots: None,
            horizon_days: None,
        }
    }

    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = Some(max_slots);
        self
    }

    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = Some(horizon_days);
        self
    }

    /// Stored policy for the user, or the configured default.
    pub async fn policy_for(&self, user_id: &str) -> Result<WorkingHoursPolicy> {
        Ok(self.policies.find(user_id).await?.unwrap_or_else(|| self.default_policy.clone()))
    }

    /// Validate and store a user's policy.
    #[instrument(skip(self, policy))]
    pub async fn update_policy(
        &self,
        user_id: &str,
        policy: WorkingHoursPolicy,
    ) -> Result<WorkingHoursPolicy> {
        policy.validate()?;
        parse_timezone(&policy.timezone)?;
        self.policies.upsert(user_id, &policy).await?;
        info!(user_id, timezone = %policy.timezone, "working hours policy updated");
        Ok(policy)
    }

    /// Suggest slots; `duration_minutes` defaults to the policy's default
    /// meeting length.
    #[instrument(skip(self))]
    pub async fn suggest(
        &self,
        user_id: &str,
        duration_minutes: Option<u32>,
    ) -> Result<AvailabilitySuggestion> {
        let started = Instant::now();
        let policy = self.policy_for(user_id).await?;

        let mut search = SlotSearch::new(duration_minutes.unwrap_or(policy.default_duration_minutes));
        if let Some(max_slots) = self.max_slots {
            search = search.with_max_slots(max_slots);
        }
        if let Some(horizon_days) = self.horizon_days {
            search = search.with_horizon_days(horizon_days);
        }
        validate_duration(search.duration_minutes, "durationMinutes")?;

        let token = self.tokens.get_valid_access_token(user_id, Provider::Calendar).await?;
        let now = self.clock.now();
        let busy = self
            .calendar
            .busy_intervals(&token.token, now, now + Duration::days(i64::from(search.horizon_days)))
            .await?;

        let slots = suggest_slots(&policy, &busy, &search, now)?;

        info!(
            user_id,
            busy_intervals = busy.len(),
            slots = slots.len(),
            token_refreshed = token.refreshed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "availability computed"
        );

        Ok(AvailabilitySuggestion {
            slots,
            working_hours: policy.summary(),
            min_notice_hours: policy.min_notice_hours,
        })
    }
}
