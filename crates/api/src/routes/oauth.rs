use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotline_domain::{Provider, Result, SlotlineError};
use tracing::info;

use super::finish;
use crate::context::AppContext;
use crate::errors::ApiError;
use crate::identity::CallerIdentity;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackRequest {
    pub provider: Provider,
    pub code: String,
    /// Must match the URI used in the authorization request; defaults to the
    /// configured redirect URI.
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub provider: Provider,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Exchange an authorization code and store the resulting credential.
pub async fn complete_authorization(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
    Json(request): Json<OAuthCallbackRequest>,
) -> std::result::Result<Json<ConnectionResponse>, ApiError> {
    let started = Instant::now();
    let result = exchange(&context, caller.user_id(), request).await;
    finish("oauth_callback", started, result).map(Json)
}

async fn exchange(
    context: &AppContext,
    user_id: &str,
    request: OAuthCallbackRequest,
) -> Result<ConnectionResponse> {
    let code = request.code.trim();
    if code.is_empty() {
        return Err(SlotlineError::validation("code", "must not be empty"));
    }
    let redirect_uri = request
        .redirect_uri
        .or_else(|| context.config.google.redirect_uri.clone())
        .ok_or_else(|| SlotlineError::validation("redirectUri", "no redirect URI configured"))?;

    let grant = context.token_endpoint.exchange_code(request.provider, code, &redirect_uri).await?;
    let credential =
        context.credentials.save_authorization(user_id, request.provider, &grant).await?;

    info!(user_id, provider = %request.provider, "authorization completed");
    Ok(ConnectionResponse {
        provider: request.provider,
        connected: true,
        expires_at: Some(credential.expires_at),
    })
}

#[derive(Debug, Deserialize)]
pub struct DisconnectRequest {
    pub provider: Provider,
}

pub async fn disconnect(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
    Json(request): Json<DisconnectRequest>,
) -> std::result::Result<Json<ConnectionResponse>, ApiError> {
    let started = Instant::now();
    let result = context
        .credentials
        .disconnect(caller.user_id(), request.provider)
        .await
        .map(|()| ConnectionResponse { provider: request.provider, connected: false, expires_at: None });
    finish("oauth_disconnect", started, result).map(Json)
}
