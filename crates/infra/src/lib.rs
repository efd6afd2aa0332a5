//! # Slotline Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite repositories for credentials, sync cursors, messages and
//!   availability policies (r2d2 pool)
//! - AES-256-GCM token cipher
//! - HTTP client with timeout and retry
//! - Google integrations (OAuth token endpoint, Gmail, Calendar free/busy,
//!   Pub/Sub push envelope)
//! - Configuration loader
//!
//! ## Architecture
//! - Implements traits defined in `slotline-core`
//! - Contains all "impure" code (I/O, network, storage)

pub mod config;
pub mod crypto;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;

// Re-export commonly used items
pub use crypto::AesTokenCipher;
pub use database::*;
pub use errors::InfraError;
pub use http::*;
pub use integrations::google::{
    GmailClient, GoogleCalendarClient, GoogleTokenEndpoint, PushEnvelope,
};
