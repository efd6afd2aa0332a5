//! Availability ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotline_domain::{BusyInterval, Result, WorkingHoursPolicy};

/// Calendar provider free/busy lookup.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Busy intervals on the user's primary calendar within `[from, to)`.
    async fn busy_intervals(
        &self,
        access_token: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>>;
}

/// Per-user working-hours policy storage.
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<WorkingHoursPolicy>>;

    async fn upsert(&self, user_id: &str, policy: &WorkingHoursPolicy) -> Result<()>;
}
