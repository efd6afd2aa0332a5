//! Caller identity forwarded by the authenticating gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user id taken from the `X-User-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn user_id(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .ok_or_else(|| ApiError::unauthorized("caller identity required"))
    }
}
