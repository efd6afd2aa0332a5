//! # Slotline API
//!
//! HTTP surface for the scheduling and mailbox-sync core.
//!
//! This crate contains:
//! - Route handlers (availability, mailbox sync, push webhook, OAuth callback)
//! - Application context (dependency injection)
//! - Error-to-status mapping and caller identity extraction
//!
//! ## Architecture
//! - Depends on `domain`, `core` and `infra`
//! - Wires up the hexagonal architecture behind an axum router

pub mod context;
pub mod errors;
pub mod identity;
pub mod routes;
pub mod utils;

pub use context::AppContext;
pub use errors::ApiError;
pub use identity::CallerIdentity;
pub use routes::router;
