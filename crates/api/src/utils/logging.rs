use std::time::Duration;

use slotline_domain::{LoggingConfig, SlotlineError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Log the outcome of a request with structured fields.
///
/// `route` must be a stable identifier without user data.
#[inline]
pub fn log_request_outcome(route: &str, elapsed: Duration, error: Option<&SlotlineError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(route, duration_ms, "request_success"),
        Some(err) => warn!(route, duration_ms, error_type = error_label(err), error = %err, "request_failure"),
    }
}

/// Convert a `SlotlineError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &SlotlineError) -> &'static str {
    match error {
        SlotlineError::Database(_) => "database",
        SlotlineError::Config(_) => "config",
        SlotlineError::Network(_) => "network",
        SlotlineError::Timeout(_) => "timeout",
        SlotlineError::Auth(_) => "auth",
        SlotlineError::NeedsReconnect(_) => "needs_reconnect",
        SlotlineError::StaleCursor(_) => "stale_cursor",
        SlotlineError::Validation { .. } => "validation",
        SlotlineError::InvalidInput(_) => "invalid_input",
        SlotlineError::Security(_) => "security",
        SlotlineError::NotFound(_) => "not_found",
        SlotlineError::Internal(_) => "internal",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if config.json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        warn!("tracing subscriber already installed");
    }
}
