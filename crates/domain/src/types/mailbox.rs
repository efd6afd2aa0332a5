//! Mailbox synchronization model: cursors, messages and provider payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Incremental sync position for one user's mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub user_id: String,
    pub mail_address: String,
    /// Provider history id; only ever moves forward except on reseed.
    pub history_id: u64,
    pub watch_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded push notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotification {
    #[serde(alias = "mailAddress")]
    pub email_address: String,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub history_id: u64,
}

/// Providers send history ids both as JSON numbers and as strings.
pub fn u64_from_number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Message ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub user_id: String,
    pub provider_message_id: String,
    pub thread_id: Option<String>,
    pub subject: String,
    pub from_name: Option<String>,
    pub from_email: String,
    pub body_snippet: String,
    pub body_full: String,
    pub received_at: DateTime<Utc>,
}

/// Persisted message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub user_id: String,
    pub provider_message_id: String,
    pub thread_id: Option<String>,
    pub subject: String,
    pub from_name: Option<String>,
    pub from_email: String,
    pub body_snippet: String,
    pub body_full: String,
    pub received_at: DateTime<Utc>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an idempotent insert keyed on `(user_id, provider_message_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Row already existed; nothing was written.
    Duplicate,
}

/// Counters for an on-demand sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MailSyncReport {
    /// Candidate ids returned by the provider.
    pub listed: usize,
    pub imported: usize,
    /// Already stored.
    pub skipped: usize,
    /// Aborted (timeout or provider error); retried on the next pass.
    pub failed: usize,
}

impl MailSyncReport {
    pub fn total(&self) -> usize {
        self.listed
    }
}

/// Result of a push-driven pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationSyncReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Cursor value persisted at the end of the pass; `None` when the
    /// notification was discarded.
    pub history_id: Option<u64>,
    /// Stale cursor triggered the bounded fallback.
    pub fell_back: bool,
}

/// Provider-neutral message as fetched from the mail API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub id: String,
    pub thread_id: Option<String>,
    pub label_ids: Vec<String>,
    pub snippet: Option<String>,
    pub internal_date: Option<DateTime<Utc>>,
    pub payload: MimePart,
}

/// One MIME part with its body already transfer-decoded to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimePart {
    pub mime_type: String,
    pub headers: Vec<MessageHeader>,
    pub body: Option<String>,
    pub parts: Vec<MimePart>,
}

impl MimePart {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Message ids added since a history id, plus the provider's new position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryDelta {
    pub message_ids: Vec<String>,
    pub history_id: u64,
}

/// Mailbox identity and current history position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxProfile {
    pub email_address: String,
    pub history_id: u64,
}

/// Push subscription acknowledged by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchRegistration {
    pub history_id: u64,
    pub expires_at: DateTime<Utc>,
}
