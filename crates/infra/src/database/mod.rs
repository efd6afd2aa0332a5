//! SQLite persistence for credentials, sync cursors, messages and
//! availability policies.

pub mod credential_repository;
pub mod manager;
pub mod message_repository;
pub mod policy_repository;
pub mod sync_cursor_repository;

use chrono::{DateTime, Utc};
use slotline_domain::SlotlineError;
use tokio::task;

pub use credential_repository::SqliteCredentialRepository;
pub use manager::{DbManager, SqliteConnection, SqlitePool};
pub use message_repository::SqliteMessageRepository;
pub use policy_repository::SqlitePolicyRepository;
pub use sync_cursor_repository::SqliteSyncCursorRepository;

use crate::errors::InfraError;

pub(crate) fn map_sql_error(err: rusqlite::Error) -> SlotlineError {
    SlotlineError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: task::JoinError) -> SlotlineError {
    if err.is_cancelled() {
        SlotlineError::Internal("blocking database task cancelled".into())
    } else {
        SlotlineError::Internal(format!("blocking database task failed: {err}"))
    }
}

pub(crate) fn from_epoch(seconds: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, seconds))
}

pub(crate) fn history_to_sql(history_id: u64) -> Result<i64, SlotlineError> {
    i64::try_from(history_id)
        .map_err(|_| SlotlineError::validation("historyId", format!("{history_id} is out of range")))
}
