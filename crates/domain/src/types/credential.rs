//! OAuth credential model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SlotlineError;

/// External provider a credential authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Mail,
    Calendar,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Mail, Provider::Calendar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mail => "mail",
            Self::Calendar => "calendar",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = SlotlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mail" => Ok(Self::Mail),
            "calendar" => Ok(Self::Calendar),
            other => Err(SlotlineError::validation("provider", format!("unknown provider '{other}'"))),
        }
    }
}

/// Persisted connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = SlotlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            other => Err(SlotlineError::Database(format!("unknown connection status '{other}'"))),
        }
    }
}

/// Credential row as stored: both secrets are sealed.
///
/// `access_token_enc` is only `None` once the credential is disconnected.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub user_id: String,
    pub provider: Provider,
    pub access_token_enc: Option<String>,
    pub refresh_token_enc: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub status: ConnectionStatus,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("has_access_token", &self.access_token_enc.is_some())
            .field("has_refresh_token", &self.refresh_token_enc.is_some())
            .field("expires_at", &self.expires_at)
            .field("status", &self.status)
            .finish()
    }
}

/// Credential with opened (plaintext) secrets. Lives only in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: String,
    pub provider: Provider,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Tokens returned by a provider token endpoint (code exchange or refresh).
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Present on code exchange; present on refresh only when the provider
    /// rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Result of asking for a usable access token.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidAccessToken {
    pub token: String,
    /// `true` when the token endpoint was called and the new token persisted.
    pub refreshed: bool,
}

impl fmt::Debug for ValidAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidAccessToken")
            .field("token", &"[REDACTED]")
            .field("refreshed", &self.refreshed)
            .finish()
    }
}
