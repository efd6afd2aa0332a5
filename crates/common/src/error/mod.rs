//! Common error type for the shared utilities.
//!
//! Higher layers convert `CommonError` into the domain error at their
//! boundary; nothing outside this crate matches on its variants except tests.

use thiserror::Error;

/// Result alias for operations in this crate.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised by the shared utilities.
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String, field: Option<String> },

    /// Serialization or deserialization errors
    #[error("Serialization error ({format}): {message}")]
    Serialization { message: String, format: String },

    /// Encryption, decryption or key derivation failures
    #[error("Cryptographic error: {message}")]
    Crypto { message: String },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {message}")]
    Internal { message: String, context: Option<String> },
}

impl CommonError {
    /// Create a configuration error for a named field
    pub fn config_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a cryptographic error
    pub fn crypto<S: Into<String>>(message: S) -> Self {
        Self::Crypto { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), context: None }
    }

    /// Create an internal error with context
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(message: S, context: C) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }

    /// Field name attached to a configuration error, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Config { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { message: err.to_string(), format: "JSON".to_string() }
    }
}
