//! HTTP routes.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use slotline_domain::Result;

use crate::context::AppContext;
use crate::errors::ApiError;
use crate::utils::logging::log_request_outcome;

pub mod availability;
pub mod health;
pub mod mailbox;
pub mod oauth;
pub mod webhook;

/// Build the service router over a shared context.
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/suggest-availability", post(availability::suggest_availability))
        .route(
            "/availability-policy",
            get(availability::get_policy).put(availability::update_policy),
        )
        .route("/sync-mailbox", post(mailbox::sync_mailbox))
        .route("/mailbox-watch", post(mailbox::register_watch))
        .route("/messages/unprocessed", get(mailbox::list_unprocessed))
        .route("/messages/processed", post(mailbox::mark_processed))
        .route("/mailbox-push-webhook", post(webhook::mailbox_push))
        .route("/oauth/callback", post(oauth::complete_authorization))
        .route("/oauth/disconnect", post(oauth::disconnect))
        .with_state(context)
}

/// Log the outcome line for `route` and convert the error for the response.
fn finish<T>(route: &'static str, started: Instant, result: Result<T>) -> std::result::Result<T, ApiError> {
    log_request_outcome(route, started.elapsed(), result.as_ref().err());
    result.map_err(ApiError::from)
}
