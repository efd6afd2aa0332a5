//! Per-user OAuth credentials and access-token lifecycle.

pub mod ports;
pub mod store;
pub mod token_lifecycle;

pub use store::CredentialStore;
pub use token_lifecycle::{needs_refresh, TokenLifecycleManager};
