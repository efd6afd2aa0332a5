//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If a required variable is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `SLOTLINE_TOKEN_ENCRYPTION_KEY`: 64 hex chars or a passphrase
//! - `SLOTLINE_WEBHOOK_SECRET`: Shared secret for the push webhook
//! - `SLOTLINE_GOOGLE_CLIENT_ID` / `SLOTLINE_GOOGLE_CLIENT_SECRET`
//!
//! Optional (defaults in parentheses):
//! - `SLOTLINE_BIND_ADDRESS` (`127.0.0.1:8080`)
//! - `SLOTLINE_WATCH_RENEWAL_INTERVAL_SECS` (3600)
//! - `SLOTLINE_DB_PATH` (`slotline.db`), `SLOTLINE_DB_POOL_SIZE` (8)
//! - `SLOTLINE_TOKEN_KEY_SALT`
//! - `SLOTLINE_GOOGLE_TOKEN_URL`, `SLOTLINE_GOOGLE_GMAIL_API_BASE`,
//!   `SLOTLINE_GOOGLE_CALENDAR_API_BASE`
//! - `SLOTLINE_GOOGLE_REDIRECT_URI`, `SLOTLINE_GOOGLE_PUBSUB_TOPIC`
//! - `SLOTLINE_REQUEST_TIMEOUT_SECS` (15)
//! - `SLOTLINE_DEFAULT_TIMEZONE` (`UTC`), `SLOTLINE_WORKDAY_START` (`09:00`),
//!   `SLOTLINE_WORKDAY_END` (`17:00`), `SLOTLINE_MIN_NOTICE_HOURS` (1),
//!   `SLOTLINE_DEFAULT_DURATION_MINUTES` (30), `SLOTLINE_SLOT_GAP_MINUTES` (30)
//! - `SLOTLINE_MAIL_RECENCY_DAYS` (7), `SLOTLINE_MAIL_MAX_MESSAGES` (50),
//!   `SLOTLINE_MESSAGE_TIMEOUT_SECS` (20)
//! - `SLOTLINE_LOG_LEVEL` (`info`), `SLOTLINE_LOG_JSON` (false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./slotline.json` or `./slotline.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use slotline_domain::{
    Config, DatabaseConfig, GoogleConfig, LoggingConfig, MailSyncConfig, Result,
    SchedulingConfig, SecurityConfig, ServerConfig, SlotlineError,
};

const ENV_PREFIX: &str = "SLOTLINE_";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `SlotlineError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `SLOTLINE_*` environment variables.
///
/// # Errors
/// Returns `SlotlineError::Config` if required variables are missing
/// or any variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let security = SecurityConfig {
        token_encryption_key: env_var("TOKEN_ENCRYPTION_KEY")?,
        token_key_salt: env_or("TOKEN_KEY_SALT", || "slotline-token-key".to_string()),
        webhook_secret: env_var("WEBHOOK_SECRET")?,
    };

    let mut google = GoogleConfig::with_client(
        env_var("GOOGLE_CLIENT_ID")?,
        env_var("GOOGLE_CLIENT_SECRET")?,
    );
    if let Some(url) = env_opt("GOOGLE_TOKEN_URL") {
        google.token_url = url;
    }
    if let Some(base) = env_opt("GOOGLE_GMAIL_API_BASE") {
        google.gmail_api_base = base;
    }
    if let Some(base) = env_opt("GOOGLE_CALENDAR_API_BASE") {
        google.calendar_api_base = base;
    }
    google.redirect_uri = env_opt("GOOGLE_REDIRECT_URI");
    google.pubsub_topic = env_opt("GOOGLE_PUBSUB_TOPIC");
    google.request_timeout_secs = env_parse("REQUEST_TIMEOUT_SECS", google.request_timeout_secs)?;

    let server_defaults = ServerConfig::default();
    let server = ServerConfig {
        bind_address: env_or("BIND_ADDRESS", || server_defaults.bind_address.clone()),
        watch_renewal_interval_secs: env_parse(
            "WATCH_RENEWAL_INTERVAL_SECS",
            server_defaults.watch_renewal_interval_secs,
        )?,
    };

    let db_defaults = DatabaseConfig::default();
    let database = DatabaseConfig {
        path: env_or("DB_PATH", || db_defaults.path.clone()),
        pool_size: env_parse("DB_POOL_SIZE", db_defaults.pool_size)?,
    };

    let sched = SchedulingConfig::default();
    let scheduling = SchedulingConfig {
        timezone: env_or("DEFAULT_TIMEZONE", || sched.timezone.clone()),
        workday_start: env_or("WORKDAY_START", || sched.workday_start.clone()),
        workday_end: env_or("WORKDAY_END", || sched.workday_end.clone()),
        min_notice_hours: env_parse("MIN_NOTICE_HOURS", sched.min_notice_hours)?,
        default_duration_minutes: env_parse(
            "DEFAULT_DURATION_MINUTES",
            sched.default_duration_minutes,
        )?,
        slot_gap_minutes: env_parse("SLOT_GAP_MINUTES", sched.slot_gap_minutes)?,
    };

    let mail = MailSyncConfig::default();
    let mail_sync = MailSyncConfig {
        recency_days: env_parse("MAIL_RECENCY_DAYS", mail.recency_days)?,
        max_messages: env_parse("MAIL_MAX_MESSAGES", mail.max_messages)?,
        message_timeout_secs: env_parse("MESSAGE_TIMEOUT_SECS", mail.message_timeout_secs)?,
        ..mail
    };

    let log_defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        level: env_or("LOG_LEVEL", || log_defaults.level.clone()),
        json: env_bool("LOG_JSON", log_defaults.json),
    };

    Ok(Config { server, database, security, google, scheduling, mail_sync, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SlotlineError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SlotlineError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SlotlineError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SlotlineError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content. Format is detected by file
/// extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SlotlineError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SlotlineError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(SlotlineError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["config.json", "config.toml", "slotline.json", "slotline.toml"];
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
        candidates.push(cwd.join("../config.json"));
        candidates.push(cwd.join("../config.toml"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable (without the `SLOTLINE_` prefix).
///
/// # Errors
/// Returns `SlotlineError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        SlotlineError::Config(format!("Missing required environment variable: {ENV_PREFIX}{key}"))
    })
}

/// Optional variable; empty values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}")).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: impl FnOnce() -> String) -> String {
    env_opt(key).unwrap_or_else(default)
}

/// Parse an optional variable, falling back to `default` when unset.
///
/// # Errors
/// Returns `SlotlineError::Config` when the variable is set but unparseable.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env_opt(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            SlotlineError::Config(format!("Invalid value for {ENV_PREFIX}{key} ({raw}): {e}"))
        }),
        None => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const REQUIRED: [(&str, &str); 4] = [
        ("SLOTLINE_TOKEN_ENCRYPTION_KEY", "correct horse battery staple"),
        ("SLOTLINE_WEBHOOK_SECRET", "hook-secret"),
        ("SLOTLINE_GOOGLE_CLIENT_ID", "client-id"),
        ("SLOTLINE_GOOGLE_CLIENT_SECRET", "client-secret"),
    ];

    fn clear_slotline_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with(ENV_PREFIX) {
                std::env::remove_var(key);
            }
        }
    }

    fn set_required() {
        for (key, value) in REQUIRED {
            std::env::set_var(key, value);
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_slotline_env();

        for value in ["1", "true", "yes", "on", "TRUE"] {
            std::env::set_var("SLOTLINE_TEST_BOOL", value);
            assert!(env_bool("TEST_BOOL", false), "{value} should be true");
        }
        for value in ["0", "false", "no", "off"] {
            std::env::set_var("SLOTLINE_TEST_BOOL", value);
            assert!(!env_bool("TEST_BOOL", true), "{value} should be false");
        }

        std::env::remove_var("SLOTLINE_TEST_BOOL");
        assert!(env_bool("TEST_BOOL", true));
        assert!(!env_bool("TEST_BOOL", false));
    }

    #[test]
    fn test_load_from_env_required_only() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_slotline_env();
        set_required();

        let config = load_from_env().expect("required vars are set");

        assert_eq!(config.security.webhook_secret, "hook-secret");
        assert_eq!(config.google.client_id, "client-id");
        assert_eq!(config.google.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.database.path, "slotline.db");
        assert_eq!(config.scheduling.timezone, "UTC");
        assert_eq!(config.mail_sync.fallback_messages, 10);
        assert!(config.google.pubsub_topic.is_none());

        clear_slotline_env();
    }

    #[test]
    fn test_load_from_env_overrides() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_slotline_env();
        set_required();
        std::env::set_var("SLOTLINE_DB_PATH", "/tmp/slotline-test.db");
        std::env::set_var("SLOTLINE_DB_POOL_SIZE", "3");
        std::env::set_var("SLOTLINE_DEFAULT_TIMEZONE", "America/New_York");
        std::env::set_var("SLOTLINE_SLOT_GAP_MINUTES", "0");
        std::env::set_var("SLOTLINE_GOOGLE_PUBSUB_TOPIC", "projects/p/topics/mail");
        std::env::set_var("SLOTLINE_LOG_JSON", "yes");

        let config = load_from_env().expect("env config");

        assert_eq!(config.database.path, "/tmp/slotline-test.db");
        assert_eq!(config.database.pool_size, 3);
        assert_eq!(config.scheduling.timezone, "America/New_York");
        assert_eq!(config.scheduling.slot_gap_minutes, 0);
        assert_eq!(config.google.pubsub_topic.as_deref(), Some("projects/p/topics/mail"));
        assert!(config.logging.json);

        clear_slotline_env();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_slotline_env();
        set_required();
        std::env::remove_var("SLOTLINE_WEBHOOK_SECRET");

        let err = load_from_env().unwrap_err();
        assert!(
            matches!(err, SlotlineError::Config(ref m) if m.contains("SLOTLINE_WEBHOOK_SECRET")),
            "unexpected error: {err:?}"
        );

        clear_slotline_env();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_slotline_env();
        set_required();
        std::env::set_var("SLOTLINE_DB_POOL_SIZE", "not-a-number");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SlotlineError::Config(_)), "Should be a Config error");

        clear_slotline_env();
    }

    #[test]
    fn test_load_from_file_toml() {
        let toml_content = r#"
[database]
path = "test.db"
pool_size = 6

[security]
token_encryption_key = "passphrase"
webhook_secret = "hook"

[google]
client_id = "id"
client_secret = "secret"
pubsub_topic = "projects/p/topics/mail"

[scheduling]
timezone = "Europe/London"
workday_start = "08:00"
workday_end = "16:00"
min_notice_hours = 2
default_duration_minutes = 45
slot_gap_minutes = 15
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("Should load config from TOML file");

        assert_eq!(config.database.pool_size, 6);
        assert_eq!(config.scheduling.default_duration_minutes, 45);
        assert_eq!(config.mail_sync.max_messages, 50);
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(SlotlineError::Config(_))));
    }

    #[test]
    fn test_parse_config_json_requires_security() {
        let json_content = r#"{ "google": { "client_id": "id", "client_secret": "s" } }"#;
        let result = parse_config(json_content, &PathBuf::from("config.json"));
        assert!(matches!(result, Err(SlotlineError::Config(ref m)) if m.contains("security")));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
