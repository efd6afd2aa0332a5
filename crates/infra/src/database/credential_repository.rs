//! SQLite-backed credential persistence. Secrets arrive already sealed.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use slotline_core::CredentialRepository;
use slotline_domain::{Provider, Result as DomainResult, SlotlineError, StoredCredential};
use tokio::task;

use super::manager::DbManager;
use super::{from_epoch, map_join_error, map_sql_error};

pub struct SqliteCredentialRepository {
    db: Arc<DbManager>,
}

impl SqliteCredentialRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialRepository for SqliteCredentialRepository {
    async fn find(&self, user_id: &str, provider: Provider) -> DomainResult<Option<StoredCredential>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<StoredCredential>> {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    "SELECT user_id, provider, access_token_enc, refresh_token_enc, expires_at, status, updated_at
                     FROM credentials WHERE user_id = ?1 AND provider = ?2",
                    params![user_id, provider.as_str()],
                    map_credential_row,
                )
                .optional()
                .map_err(map_sql_error)?;
            Ok(row)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert(&self, credential: StoredCredential) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO credentials (user_id, provider, access_token_enc, refresh_token_enc, expires_at, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, provider) DO UPDATE SET
                    access_token_enc = excluded.access_token_enc,
                    refresh_token_enc = excluded.refresh_token_enc,
                    expires_at = excluded.expires_at,
                    status = excluded.status,
                    updated_at = excluded.updated_at",
                params![
                    credential.user_id,
                    credential.provider.as_str(),
                    credential.access_token_enc,
                    credential.refresh_token_enc,
                    credential.expires_at.timestamp(),
                    credential.status.as_str(),
                    credential.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_access_token(
        &self,
        user_id: &str,
        provider: Provider,
        access_token_enc: String,
        refresh_token_enc: Option<String>,
        expires_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE credentials SET
                    access_token_enc = ?3,
                    refresh_token_enc = COALESCE(?4, refresh_token_enc),
                    expires_at = ?5,
                    updated_at = ?6
                 WHERE user_id = ?1 AND provider = ?2",
                params![
                    user_id,
                    provider.as_str(),
                    access_token_enc,
                    refresh_token_enc,
                    expires_at.timestamp(),
                    updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_disconnected(
        &self,
        user_id: &str,
        provider: Provider,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE credentials SET
                    access_token_enc = NULL,
                    refresh_token_enc = NULL,
                    status = 'disconnected',
                    updated_at = ?3
                 WHERE user_id = ?1 AND provider = ?2",
                params![user_id, provider.as_str(), updated_at.timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_credential_row(row: &Row<'_>) -> rusqlite::Result<StoredCredential> {
    let provider: String = row.get(1)?;
    let status: String = row.get(5)?;

    Ok(StoredCredential {
        user_id: row.get(0)?,
        provider: parse_text_column(1, &provider)?,
        access_token_enc: row.get(2)?,
        refresh_token_enc: row.get(3)?,
        expires_at: from_epoch(row.get(4)?)?,
        status: parse_text_column(5, &status)?,
        updated_at: from_epoch(row.get(6)?)?,
    })
}

fn parse_text_column<T>(index: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = SlotlineError>,
{
    raw.parse().map_err(|err: SlotlineError| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use slotline_domain::ConnectionStatus;
    use tempfile::TempDir;

    use super::*;

    fn repo() -> (TempDir, SqliteCredentialRepository) {
        let dir = TempDir::new().unwrap();
        let db = DbManager::open(dir.path().join("creds.db"), 2).unwrap();
        (dir, SqliteCredentialRepository::new(Arc::new(db)))
    }

    fn stored(access: &str, refresh: Option<&str>) -> StoredCredential {
        StoredCredential {
            user_id: "u1".into(),
            provider: Provider::Mail,
            access_token_enc: Some(access.into()),
            refresh_token_enc: refresh.map(Into::into),
            expires_at: Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap(),
            status: ConnectionStatus::Connected,
            updated_at: Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let (_dir, repo) = repo();
        repo.upsert(stored("sealed-a", Some("sealed-r"))).await.unwrap();

        let row = repo.find("u1", Provider::Mail).await.unwrap().unwrap();
        assert_eq!(row, stored("sealed-a", Some("sealed-r")));
        assert!(repo.find("u1", Provider::Calendar).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_keeps_refresh_token_unless_rotated() {
        let (_dir, repo) = repo();
        repo.upsert(stored("sealed-a", Some("sealed-r"))).await.unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();

        repo.update_access_token("u1", Provider::Mail, "sealed-b".into(), None, later + Duration::hours(1), later)
            .await
            .unwrap();
        let row = repo.find("u1", Provider::Mail).await.unwrap().unwrap();
        assert_eq!(row.access_token_enc.as_deref(), Some("sealed-b"));
        assert_eq!(row.refresh_token_enc.as_deref(), Some("sealed-r"));
        assert_eq!(row.expires_at, later + Duration::hours(1));

        repo.update_access_token("u1", Provider::Mail, "sealed-c".into(), Some("sealed-r2".into()), later, later)
            .await
            .unwrap();
        let row = repo.find("u1", Provider::Mail).await.unwrap().unwrap();
        assert_eq!(row.refresh_token_enc.as_deref(), Some("sealed-r2"));
    }

    #[tokio::test]
    async fn disconnect_clears_secrets() {
        let (_dir, repo) = repo();
        repo.upsert(stored("sealed-a", Some("sealed-r"))).await.unwrap();

        repo.mark_disconnected("u1", Provider::Mail, Utc::now()).await.unwrap();

        let row = repo.find("u1", Provider::Mail).await.unwrap().unwrap();
        assert_eq!(row.status, ConnectionStatus::Disconnected);
        assert!(row.access_token_enc.is_none());
        assert!(row.refresh_token_enc.is_none());
    }
}
