//! Configuration structures
//!
//! Populated by the infra config loader from `SLOTLINE_*` environment
//! variables or a JSON/TOML file. Every section except `security` and
//! `google` has workable defaults.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BODY_MAX_CHARS, BODY_SNIPPET_CHARS, DEFAULT_MAX_SYNC_MESSAGES, DEFAULT_MEETING_DURATION_MINUTES,
    DEFAULT_MESSAGE_TIMEOUT_SECS, DEFAULT_RECENCY_DAYS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SLOT_GAP_MINUTES, STALE_CURSOR_FALLBACK_MESSAGES,
};
use crate::types::WorkingHoursPolicy;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub google: GoogleConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub mail_sync: MailSyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    /// How often expiring watch subscriptions are renewed.
    #[serde(default = "default_watch_renewal_interval")]
    pub watch_renewal_interval_secs: u64,
}

fn default_watch_renewal_interval() -> u64 {
    60 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            watch_renewal_interval_secs: default_watch_renewal_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "slotline.db".to_string(), pool_size: 8 }
    }
}

/// Secrets. `Debug` is implemented by hand so they never reach logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// 64 hex chars (raw AES-256 key) or a passphrase stretched with Argon2.
    pub token_encryption_key: String,
    #[serde(default = "default_key_salt")]
    pub token_key_salt: String,
    pub webhook_secret: String,
}

fn default_key_salt() -> String {
    "slotline-token-key".to_string()
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("token_encryption_key", &"[REDACTED]")
            .field("token_key_salt", &self.token_key_salt)
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_gmail_api_base")]
    pub gmail_api_base: String,
    #[serde(default = "default_calendar_api_base")]
    pub calendar_api_base: String,
    /// Redirect URI registered for the authorization-code flow.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Pub/Sub topic for mailbox watch subscriptions.
    #[serde(default)]
    pub pubsub_topic: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_gmail_api_base() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}

fn default_calendar_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl GoogleConfig {
    /// Endpoints pointing at Google with the given client credentials.
    pub fn with_client(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: default_token_url(),
            gmail_api_base: default_gmail_api_base(),
            calendar_api_base: default_calendar_api_base(),
            redirect_uri: None,
            pubsub_topic: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("gmail_api_base", &self.gmail_api_base)
            .field("calendar_api_base", &self.calendar_api_base)
            .field("redirect_uri", &self.redirect_uri)
            .field("pubsub_topic", &self.pubsub_topic)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Working-hours defaults applied to users without a stored policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub timezone: String,
    pub workday_start: String,
    pub workday_end: String,
    pub min_notice_hours: u32,
    pub default_duration_minutes: u32,
    pub slot_gap_minutes: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            workday_start: "09:00".to_string(),
            workday_end: "17:00".to_string(),
            min_notice_hours: 1,
            default_duration_minutes: DEFAULT_MEETING_DURATION_MINUTES,
            slot_gap_minutes: DEFAULT_SLOT_GAP_MINUTES,
        }
    }
}

impl SchedulingConfig {
    /// Build the default policy, rejecting unparseable times.
    pub fn default_policy(&self) -> crate::Result<WorkingHoursPolicy> {
        let parse = |raw: &str, field: &str| -> crate::Result<NaiveTime> {
            crate::types::availability::time_of_day::parse(raw)
                .map_err(|msg| crate::SlotlineError::Config(format!("scheduling.{field}: {msg}")))
        };

        let policy = WorkingHoursPolicy {
            timezone: self.timezone.clone(),
            start_time: parse(&self.workday_start, "workday_start")?,
            end_time: parse(&self.workday_end, "workday_end")?,
            min_notice_hours: self.min_notice_hours,
            default_duration_minutes: self.default_duration_minutes,
            slot_gap_minutes: self.slot_gap_minutes,
        };
        policy.validate().map_err(|e| crate::SlotlineError::Config(format!("scheduling: {e}")))?;
        Ok(policy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSyncConfig {
    pub recency_days: u32,
    pub max_messages: usize,
    pub fallback_messages: usize,
    pub snippet_chars: usize,
    pub body_max_chars: usize,
    pub message_timeout_secs: u64,
}

impl Default for MailSyncConfig {
    fn default() -> Self {
        Self {
            recency_days: DEFAULT_RECENCY_DAYS,
            max_messages: DEFAULT_MAX_SYNC_MESSAGES,
            fallback_messages: STALE_CURSOR_FALLBACK_MESSAGES,
            snippet_chars: BODY_SNIPPET_CHARS,
            body_max_chars: BODY_MAX_CHARS,
            message_timeout_secs: DEFAULT_MESSAGE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
