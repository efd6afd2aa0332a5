//! # Slotline Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for stores and providers
//! - Credential store and token lifecycle
//! - Availability engine (timezone-aware slot search)
//! - Mailbox synchronizer (incremental + fallback) and body extraction
//!
//! ## Architecture Principles
//! - Only depends on `slotline-common` and `slotline-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod availability;
pub mod credentials;
pub mod mailbox;

// Re-export specific items to avoid ambiguity
pub use availability::ports::{CalendarProvider, PolicyRepository};
pub use availability::{suggest_slots, AvailabilityService, SlotSearch};
pub use credentials::ports::{CredentialRepository, TokenCipher, TokenEndpoint};
pub use credentials::{CredentialStore, TokenLifecycleManager};
pub use mailbox::html::html_to_plain_text;
pub use mailbox::ports::{MailProvider, MessageRepository, SyncCursorRepository};
pub use mailbox::MailboxSynchronizer;
