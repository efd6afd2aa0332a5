//! SQLite-backed mailbox sync cursors.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use slotline_core::SyncCursorRepository;
use slotline_domain::{Result as DomainResult, SlotlineError, SyncCursor};
use tokio::task;

use super::manager::DbManager;
use super::{from_epoch, history_to_sql, map_join_error, map_sql_error};

const CURSOR_COLUMNS: &str = "user_id, mail_address, history_id, watch_expires_at, updated_at";

pub struct SqliteSyncCursorRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncCursorRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn find_where(&self, clause: &'static str, value: String) -> DomainResult<Option<SyncCursor>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<SyncCursor>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {CURSOR_COLUMNS} FROM sync_cursors WHERE {clause}"),
                params![value],
                map_cursor_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncCursorRepository for SqliteSyncCursorRepository {
    async fn find_by_user(&self, user_id: &str) -> DomainResult<Option<SyncCursor>> {
        self.find_where("user_id = ?1", user_id.to_string()).await
    }

    async fn find_by_mail_address(&self, mail_address: &str) -> DomainResult<Option<SyncCursor>> {
        self.find_where("mail_address = ?1", mail_address.trim().to_string()).await
    }

    async fn upsert(&self, cursor: SyncCursor) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let history_id = history_to_sql(cursor.history_id)?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_cursors (user_id, mail_address, history_id, watch_expires_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    mail_address = excluded.mail_address,
                    history_id = MAX(sync_cursors.history_id, excluded.history_id),
                    watch_expires_at = excluded.watch_expires_at,
                    updated_at = excluded.updated_at",
                params![
                    cursor.user_id,
                    cursor.mail_address,
                    history_id,
                    cursor.watch_expires_at.map(|at| at.timestamp()),
                    cursor.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn advance(&self, user_id: &str, history_id: u64, at: DateTime<Utc>) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let target = history_to_sql(history_id)?;

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            // Single statement so concurrent passes cannot interleave a
            // read-compare-write and move the cursor backwards.
            conn.execute(
                "UPDATE sync_cursors SET history_id = ?2, updated_at = ?3
                 WHERE user_id = ?1 AND history_id < ?2",
                params![user_id, target, at.timestamp()],
            )
            .map_err(map_sql_error)?;

            let stored: Option<i64> = conn
                .query_row(
                    "SELECT history_id FROM sync_cursors WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_sql_error)?;

            let stored = stored.ok_or_else(|| {
                SlotlineError::NotFound(format!("no sync cursor for user {user_id}"))
            })?;
            Ok(u64::try_from(stored).unwrap_or_default())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn reseed(&self, user_id: &str, history_id: u64, at: DateTime<Utc>) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let target = history_to_sql(history_id)?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE sync_cursors SET history_id = ?2, updated_at = ?3 WHERE user_id = ?1",
                    params![user_id, target, at.timestamp()],
                )
                .map_err(map_sql_error)?;
            if updated == 0 {
                return Err(SlotlineError::NotFound(format!("no sync cursor for user {user_id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_expiring_watches(&self, before: DateTime<Utc>) -> DomainResult<Vec<SyncCursor>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncCursor>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {CURSOR_COLUMNS} FROM sync_cursors
                     WHERE watch_expires_at IS NULL OR watch_expires_at < ?1
                     ORDER BY watch_expires_at"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![before.timestamp()], map_cursor_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_cursor_row(row: &Row<'_>) -> rusqlite::Result<SyncCursor> {
    let history_id: i64 = row.get(2)?;
    let watch_expires_at: Option<i64> = row.get(3)?;

    Ok(SyncCursor {
        user_id: row.get(0)?,
        mail_address: row.get(1)?,
        history_id: u64::try_from(history_id)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(2, history_id))?,
        watch_expires_at: watch_expires_at.map(from_epoch).transpose()?,
        updated_at: from_epoch(row.get(4)?)?,
    })
}
