//! Push ingestion.
//!
//! The shared secret is checked before anything else; that is the only
//! failure reported to the caller. Every other outcome, including internal
//! errors, is acknowledged with `200` so the push subscription is not
//! retried into the ground.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use slotline_infra::PushEnvelope;
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::utils::logging::log_request_outcome;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";
pub const WEBHOOK_TOKEN_PARAM: &str = "token";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<usize>,
}

impl WebhookAck {
    fn accepted(imported: Option<usize>) -> Response {
        (StatusCode::OK, Json(Self { success: true, imported })).into_response()
    }
}

pub async fn mailbox_push(
    State(context): State<Arc<AppContext>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();

    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .or_else(|| params.get(WEBHOOK_TOKEN_PARAM).map(String::as_str));
    if !presented.is_some_and(|secret| context.verify_webhook_secret(secret)) {
        warn!(header_present = headers.contains_key(WEBHOOK_SECRET_HEADER), "webhook secret rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "success": false, "error": "invalid webhook secret" })),
        )
            .into_response();
    }

    let envelope: PushEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "push envelope is not valid JSON; acknowledging");
            return WebhookAck::accepted(None);
        }
    };

    let notification = match envelope.notification() {
        Ok(Some(notification)) => notification,
        Ok(None) => {
            debug!(message_id = ?envelope.message_id(), "push envelope carried no data");
            return WebhookAck::accepted(None);
        }
        Err(err) => {
            warn!(message_id = ?envelope.message_id(), error = %err, "push payload could not be decoded");
            return WebhookAck::accepted(None);
        }
    };

    match context.mailbox.sync_from_notification(&notification).await {
        Ok(report) => {
            log_request_outcome("mailbox_push_webhook", started.elapsed(), None);
            WebhookAck::accepted(Some(report.imported))
        }
        Err(err) => {
            log_request_outcome("mailbox_push_webhook", started.elapsed(), Some(&err));
            WebhookAck::accepted(None)
        }
    }
}
