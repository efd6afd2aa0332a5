//! SQLite-backed working-hours policies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use slotline_core::PolicyRepository;
use slotline_domain::{Result as DomainResult, WorkingHoursPolicy};
use tokio::task;

use super::manager::DbManager;
use super::{map_join_error, map_sql_error};

const TIME_FORMAT: &str = "%H:%M";

pub struct SqlitePolicyRepository {
    db: Arc<DbManager>,
}

impl SqlitePolicyRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PolicyRepository for SqlitePolicyRepository {
    async fn find(&self, user_id: &str) -> DomainResult<Option<WorkingHoursPolicy>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<WorkingHoursPolicy>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT timezone, start_time, end_time, min_notice_hours, default_duration_minutes, slot_gap_minutes
                 FROM availability_policies WHERE user_id = ?1",
                params![user_id],
                map_policy_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert(&self, user_id: &str, policy: &WorkingHoursPolicy) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let policy = policy.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO availability_policies
                    (user_id, timezone, start_time, end_time, min_notice_hours, default_duration_minutes, slot_gap_minutes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(user_id) DO UPDATE SET
                    timezone = excluded.timezone,
                    start_time = excluded.start_time,
                    end_time = excluded.end_time,
                    min_notice_hours = excluded.min_notice_hours,
                    default_duration_minutes = excluded.default_duration_minutes,
                    slot_gap_minutes = excluded.slot_gap_minutes,
                    updated_at = excluded.updated_at",
                params![
                    user_id,
                    policy.timezone,
                    policy.start_time.format(TIME_FORMAT).to_string(),
                    policy.end_time.format(TIME_FORMAT).to_string(),
                    policy.min_notice_hours,
                    policy.default_duration_minutes,
                    policy.slot_gap_minutes,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_policy_row(row: &Row<'_>) -> rusqlite::Result<WorkingHoursPolicy> {
    Ok(WorkingHoursPolicy {
        timezone: row.get(0)?,
        start_time: time_column(row, 1)?,
        end_time: time_column(row, 2)?,
        min_notice_hours: row.get(3)?,
        default_duration_minutes: row.get(4)?,
        slot_gap_minutes: row.get(5)?,
    })
}

fn time_column(row: &Row<'_>, index: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(index)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}
