//! Mailbox ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotline_domain::{
    HistoryDelta, MailMessage, MailboxProfile, NewMessage, Result, StoredMessage, SyncCursor,
    UpsertOutcome, WatchRegistration,
};

/// Mail provider API, called with an already-valid access token.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Message ids matching `query`, newest first, at most `max_results`.
    async fn list_message_ids(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>>;

    async fn get_message(&self, access_token: &str, message_id: &str) -> Result<MailMessage>;

    /// Ids of messages added since `start_history_id`.
    ///
    /// # Errors
    /// `SlotlineError::StaleCursor` when the provider no longer recognises
    /// the start id.
    async fn list_history(&self, access_token: &str, start_history_id: u64)
        -> Result<HistoryDelta>;

    async fn get_profile(&self, access_token: &str) -> Result<MailboxProfile>;

    /// Start (or renew) push notifications to `topic`.
    async fn watch(&self, access_token: &str, topic: &str) -> Result<WatchRegistration>;
}

/// Message store with idempotent insert on `(user_id, provider_message_id)`.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn exists(&self, user_id: &str, provider_message_id: &str) -> Result<bool>;

    async fn insert_if_absent(&self, message: NewMessage) -> Result<UpsertOutcome>;

    /// Unprocessed messages, newest first.
    async fn list_unprocessed(&self, user_id: &str, limit: usize) -> Result<Vec<StoredMessage>>;

    /// Returns the number of rows flipped.
    async fn mark_processed(&self, user_id: &str, provider_message_ids: &[String])
        -> Result<usize>;
}

/// Sync cursor storage.
#[async_trait]
pub trait SyncCursorRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<SyncCursor>>;

    async fn find_by_mail_address(&self, mail_address: &str) -> Result<Option<SyncCursor>>;

    /// Insert the cursor for its user or update an existing one. The stored
    /// history id never decreases.
    async fn upsert(&self, cursor: SyncCursor) -> Result<()>;

    /// Move the history id forward; a lower value leaves it unchanged.
    /// Returns the stored value after the write.
    async fn advance(&self, user_id: &str, history_id: u64, at: DateTime<Utc>) -> Result<u64>;

    /// Overwrite the history id unconditionally (stale-cursor recovery).
    async fn reseed(&self, user_id: &str, history_id: u64, at: DateTime<Utc>) -> Result<()>;

    /// Cursors whose watch expires before `before` (or was never set).
    async fn list_expiring_watches(&self, before: DateTime<Utc>) -> Result<Vec<SyncCursor>>;
}
