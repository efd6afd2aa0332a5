//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Provider;

/// Main error type for Slotline
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SlotlineError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient provider failure (connection, 429, 5xx).
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Stored credential can no longer produce a valid token; the user must
    /// re-authorize this provider.
    #[error("Reconnect required for {0} provider")]
    NeedsReconnect(Provider),

    /// Incremental history query rejected the stored cursor.
    #[error("Sync cursor is stale: {0}")]
    StaleCursor(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlotlineError {
    /// Build a validation error naming the offending field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Result type alias for Slotline operations
pub type Result<T> = std::result::Result<T, SlotlineError>;
