//! SQLite-backed message store.
//!
//! `(user_id, provider_message_id)` is unique, so inserts are idempotent and
//! overlapping sync passes race harmlessly on the constraint.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Row};
use slotline_core::MessageRepository;
use slotline_domain::{NewMessage, Result as DomainResult, StoredMessage, UpsertOutcome};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use super::{from_epoch, map_join_error, map_sql_error};

pub struct SqliteMessageRepository {
    db: Arc<DbManager>,
}

impl SqliteMessageRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn exists(&self, user_id: &str, provider_message_id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let provider_message_id = provider_message_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE user_id = ?1 AND provider_message_id = ?2)",
                params![user_id, provider_message_id],
                |row| row.get::<_, bool>(0),
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_if_absent(&self, message: NewMessage) -> DomainResult<UpsertOutcome> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<UpsertOutcome> {
            let conn = db.get_connection()?;
            let inserted = conn
                .execute(
                    "INSERT INTO messages
                        (id, user_id, provider_message_id, thread_id, subject, from_name, from_email,
                         body_snippet, body_full, received_at, processed, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)
                     ON CONFLICT(user_id, provider_message_id) DO NOTHING",
                    params![
                        Uuid::now_v7().to_string(),
                        message.user_id,
                        message.provider_message_id,
                        message.thread_id,
                        message.subject,
                        message.from_name,
                        message.from_email,
                        message.body_snippet,
                        message.body_full,
                        message.received_at.timestamp(),
                        Utc::now().timestamp(),
                    ],
                )
                .map_err(map_sql_error)?;

            Ok(if inserted == 0 { UpsertOutcome::Duplicate } else { UpsertOutcome::Inserted })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_unprocessed(&self, user_id: &str, limit: usize) -> DomainResult<Vec<StoredMessage>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        task::spawn_blocking(move || -> DomainResult<Vec<StoredMessage>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, provider_message_id, thread_id, subject, from_name, from_email,
                            body_snippet, body_full, received_at, processed, created_at
                     FROM messages
                     WHERE user_id = ?1 AND processed = 0
                     ORDER BY received_at DESC, id DESC
                     LIMIT ?2",
                )
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![user_id, limit], map_message_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_processed(&self, user_id: &str, provider_message_ids: &[String]) -> DomainResult<usize> {
        if provider_message_ids.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let ids = provider_message_ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!(
                "UPDATE messages SET processed = 1
                 WHERE processed = 0 AND user_id = ? AND provider_message_id IN ({placeholders})"
            );

            let bindings = std::iter::once(user_id).chain(ids);
            conn.execute(&sql, params_from_iter(bindings)).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider_message_id: row.get(2)?,
        thread_id: row.get(3)?,
        subject: row.get(4)?,
        from_name: row.get(5)?,
        from_email: row.get(6)?,
        body_snippet: row.get(7)?,
        body_full: row.get(8)?,
        received_at: from_epoch(row.get(9)?)?,
        processed: row.get(10)?,
        created_at: from_epoch(row.get(11)?)?,
    })
}
