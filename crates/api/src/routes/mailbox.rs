use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotline_domain::constants::DEFAULT_UNPROCESSED_PAGE_SIZE;
use slotline_domain::{SlotlineError, StoredMessage};

use super::finish;
use crate::context::AppContext;
use crate::errors::ApiError;
use crate::identity::CallerIdentity;

const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMailboxResponse {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

pub async fn sync_mailbox(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
) -> Result<Json<SyncMailboxResponse>, ApiError> {
    let started = Instant::now();
    let result = context.mailbox.sync(caller.user_id()).await.map(|report| SyncMailboxResponse {
        imported: report.imported,
        skipped: report.skipped,
        failed: report.failed,
        total: report.total(),
    });
    finish("sync_mailbox", started, result).map(Json)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxWatchResponse {
    pub mail_address: String,
    pub history_id: u64,
    pub watch_expires_at: Option<DateTime<Utc>>,
}

pub async fn register_watch(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
) -> Result<Json<MailboxWatchResponse>, ApiError> {
    let started = Instant::now();
    let result = context.mailbox.register_watch(caller.user_id()).await.map(|cursor| {
        MailboxWatchResponse {
            mail_address: cursor.mail_address,
            history_id: cursor.history_id,
            watch_expires_at: cursor.watch_expires_at,
        }
    });
    finish("mailbox_watch", started, result).map(Json)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUnprocessedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub provider_message_id: String,
    pub thread_id: Option<String>,
    pub subject: String,
    pub from_name: Option<String>,
    pub from_email: String,
    pub body_snippet: String,
    pub body_full: String,
    pub received_at: DateTime<Utc>,
}

impl From<StoredMessage> for MessageView {
    fn from(message: StoredMessage) -> Self {
        Self {
            id: message.id,
            provider_message_id: message.provider_message_id,
            thread_id: message.thread_id,
            subject: message.subject,
            from_name: message.from_name,
            from_email: message.from_email,
            body_snippet: message.body_snippet,
            body_full: message.body_full,
            received_at: message.received_at,
        }
    }
}

pub async fn list_unprocessed(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
    Query(query): Query<ListUnprocessedQuery>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let started = Instant::now();
    let limit = query.limit.unwrap_or(DEFAULT_UNPROCESSED_PAGE_SIZE);

    let result = if limit == 0 || limit > MAX_PAGE_SIZE {
        Err(SlotlineError::validation("limit", format!("must be between 1 and {MAX_PAGE_SIZE}")))
    } else {
        context
            .mailbox
            .list_unprocessed(caller.user_id(), limit)
            .await
            .map(|rows| rows.into_iter().map(MessageView::from).collect())
    };
    finish("list_unprocessed_messages", started, result).map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkProcessedRequest {
    pub message_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkProcessedResponse {
    pub updated: usize,
}

pub async fn mark_processed(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
    Json(request): Json<MarkProcessedRequest>,
) -> Result<Json<MarkProcessedResponse>, ApiError> {
    let started = Instant::now();
    let result = context
        .mailbox
        .mark_processed(caller.user_id(), &request.message_ids)
        .await
        .map(|updated| MarkProcessedResponse { updated });
    finish("mark_messages_processed", started, result).map(Json)
}
