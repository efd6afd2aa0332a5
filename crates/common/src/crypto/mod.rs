//! Symmetric encryption used to seal OAuth tokens at rest.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService};
