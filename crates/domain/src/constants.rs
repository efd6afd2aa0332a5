//! Application constants
//!
//! Centralized location for the domain-level constants shared by the token
//! lifecycle, availability engine and mailbox synchronizer.

// Token lifecycle
/// A cached access token is used only while `now < expires_at - threshold`.
pub const TOKEN_REFRESH_THRESHOLD_SECS: i64 = 300;

// Availability engine
/// Slot starts are aligned to this boundary (local wall clock).
pub const SLOT_ROUNDING_MINUTES: i64 = 30;
pub const DEFAULT_MAX_SLOTS: usize = 3;
pub const DEFAULT_HORIZON_DAYS: u32 = 7;
/// Spacing added after an accepted slot before the next candidate.
pub const DEFAULT_SLOT_GAP_MINUTES: u32 = 30;
pub const DEFAULT_MEETING_DURATION_MINUTES: u32 = 30;
pub const MAX_MEETING_DURATION_MINUTES: u32 = 24 * 60;

// Mailbox synchronizer
pub const DEFAULT_RECENCY_DAYS: u32 = 7;
pub const DEFAULT_MAX_SYNC_MESSAGES: usize = 50;
/// Size of the unread-primary query used when the history cursor is stale.
pub const STALE_CURSOR_FALLBACK_MESSAGES: usize = 10;
pub const BODY_SNIPPET_CHARS: usize = 200;
pub const BODY_MAX_CHARS: usize = 10_000;
pub const INBOX_SYNC_QUERY_EXCLUSIONS: &str =
    "-category:promotions -category:social -category:updates";
pub const FALLBACK_SYNC_QUERY: &str = "in:inbox is:unread category:primary";
/// Watches expiring within this window are renewed by the periodic sweep.
pub const WATCH_RENEWAL_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_UNPROCESSED_PAGE_SIZE: usize = 50;

// External calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MESSAGE_TIMEOUT_SECS: u64 = 20;
