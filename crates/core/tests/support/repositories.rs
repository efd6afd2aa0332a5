//! Mock repository implementations for testing
//!
//! In-memory versions of the core storage ports. State lives behind
//! `Arc<Mutex<..>>` so a clone handed to a service and the one kept by the
//! test observe the same rows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotline_core::{CredentialRepository, MessageRepository, PolicyRepository, SyncCursorRepository};
use slotline_domain::{
    ConnectionStatus, NewMessage, Provider, Result as DomainResult, StoredCredential,
    StoredMessage, SyncCursor, UpsertOutcome, WorkingHoursPolicy,
};

/// In-memory mock for `CredentialRepository`.
#[derive(Default, Clone)]
pub struct MockCredentialRepository {
    rows: Arc<Mutex<HashMap<(String, Provider), StoredCredential>>>,
    token_updates: Arc<Mutex<usize>>,
}

impl MockCredentialRepository {
    pub fn insert(&self, row: StoredCredential) {
        self.rows.lock().unwrap().insert((row.user_id.clone(), row.provider), row);
    }

    pub fn get(&self, user_id: &str, provider: Provider) -> Option<StoredCredential> {
        self.rows.lock().unwrap().get(&(user_id.to_string(), provider)).cloned()
    }

    /// Number of `update_access_token` calls seen.
    pub fn token_updates(&self) -> usize {
        *self.token_updates.lock().unwrap()
    }
}

#[async_trait]
impl CredentialRepository for MockCredentialRepository {
    async fn find(&self, user_id: &str, provider: Provider) -> DomainResult<Option<StoredCredential>> {
        Ok(self.get(user_id, provider))
    }

    async fn upsert(&self, credential: StoredCredential) -> DomainResult<()> {
        self.insert(credential);
        Ok(())
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
        *self.token_updates.lock().unwrap() += 1;
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.get_mut(&(user_id.to_string(), provider)) {
            row.access_token_enc = Some(access_token_enc);
            if refresh_token_enc.is_some() {
                row.refresh_token_enc = refresh_token_enc;
            }
            row.expires_at = expires_at;
            row.updated_at = updated_at;
        }
        Ok(())
    }

    async fn mark_disconnected(
        &self,
        user_id: &str,
        provider: Provider,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.get_mut(&(user_id.to_string(), provider)) {
            row.access_token_enc = None;
            row.refresh_token_enc = None;
            row.status = ConnectionStatus::Disconnected;
            row.updated_at = updated_at;
        }
        Ok(())
    }
}

/// In-memory mock for `PolicyRepository`.
#[derive(Default, Clone)]
pub struct MockPolicyRepository {
    policies: Arc<Mutex<HashMap<String, WorkingHoursPolicy>>>,
}

impl MockPolicyRepository {
    pub fn with_policy(self, user_id: &str, policy: WorkingHoursPolicy) -> Self {
        self.policies.lock().unwrap().insert(user_id.to_string(), policy);
        self
    }

    pub fn get(&self, user_id: &str) -> Option<WorkingHoursPolicy> {
        self.policies.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl PolicyRepository for MockPolicyRepository {
    async fn find(&self, user_id: &str) -> DomainResult<Option<WorkingHoursPolicy>> {
        Ok(self.get(user_id))
    }

    async fn upsert(&self, user_id: &str, policy: &WorkingHoursPolicy) -> DomainResult<()> {
        self.policies.lock().unwrap().insert(user_id.to_string(), policy.clone());
        Ok(())
    }
}

/// In-memory mock for `MessageRepository` enforcing the
/// `(user_id, provider_message_id)` uniqueness the real table has.
#[derive(Default, Clone)]
pub struct MockMessageRepository {
    rows: Arc<Mutex<Vec<StoredMessage>>>,
}

impl MockMessageRepository {
    pub fn stored(&self) -> Vec<StoredMessage> {
        self.rows.lock().unwrap().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows.lock().unwrap().iter().map(|m| m.provider_message_id.clone()).collect()
    }
}

#[async_trait]
impl MessageRepository for MockMessageRepository {
    async fn exists(&self, user_id: &str, provider_message_id: &str) -> DomainResult<bool> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.user_id == user_id && m.provider_message_id == provider_message_id))
    }

    async fn insert_if_absent(&self, message: NewMessage) -> DomainResult<UpsertOutcome> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|m| m.user_id == message.user_id && m.provider_message_id == message.provider_message_id)
        {
            return Ok(UpsertOutcome::Duplicate);
        }

        let id = format!("msg-{}", rows.len() + 1);
        rows.push(StoredMessage {
            id,
            user_id: message.user_id,
            provider_message_id: message.provider_message_id,
            thread_id: message.thread_id,
            subject: message.subject,
            from_name: message.from_name,
            from_email: message.from_email,
            body_snippet: message.body_snippet,
            body_full: message.body_full,
            received_at: message.received_at,
            processed: false,
            created_at: message.received_at,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn list_unprocessed(&self, user_id: &str, limit: usize) -> DomainResult<Vec<StoredMessage>> {
        let mut rows: Vec<StoredMessage> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id && !m.processed)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn mark_processed(
        &self,
        user_id: &str,
        provider_message_ids: &[String],
    ) -> DomainResult<usize> {
        let mut flipped = 0;
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.user_id == user_id
                && !row.processed
                && provider_message_ids.contains(&row.provider_message_id)
            {
                row.processed = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

/// In-memory mock for `SyncCursorRepository`.
#[derive(Default, Clone)]
pub struct MockSyncCursorRepository {
    cursors: Arc<Mutex<HashMap<String, SyncCursor>>>,
}

impl MockSyncCursorRepository {
    pub fn with_cursor(self, cursor: SyncCursor) -> Self {
        self.cursors.lock().unwrap().insert(cursor.user_id.clone(), cursor);
        self
    }

    pub fn get(&self, user_id: &str) -> Option<SyncCursor> {
        self.cursors.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl SyncCursorRepository for MockSyncCursorRepository {
    async fn find_by_user(&self, user_id: &str) -> DomainResult<Option<SyncCursor>> {
        Ok(self.get(user_id))
    }

    async fn find_by_mail_address(&self, mail_address: &str) -> DomainResult<Option<SyncCursor>> {
        Ok(self
            .cursors
            .lock()
            .unwrap()
            .values()
            .find(|c| c.mail_address.eq_ignore_ascii_case(mail_address))
            .cloned())
    }

    async fn upsert(&self, mut cursor: SyncCursor) -> DomainResult<()> {
        let mut cursors = self.cursors.lock().unwrap();
        if let Some(existing) = cursors.get(&cursor.user_id) {
            cursor.history_id = cursor.history_id.max(existing.history_id);
        }
        cursors.insert(cursor.user_id.clone(), cursor);
        Ok(())
    }

    async fn advance(&self, user_id: &str, history_id: u64, at: DateTime<Utc>) -> DomainResult<u64> {
        let mut cursors = self.cursors.lock().unwrap();
        match cursors.get_mut(user_id) {
            Some(cursor) => {
                if history_id > cursor.history_id {
                    cursor.history_id = history_id;
                    cursor.updated_at = at;
                }
                Ok(cursor.history_id)
            }
            None => Ok(history_id),
        }
    }

    async fn reseed(&self, user_id: &str, history_id: u64, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(cursor) = self.cursors.lock().unwrap().get_mut(user_id) {
            cursor.history_id = history_id;
            cursor.updated_at = at;
        }
        Ok(())
    }

    async fn list_expiring_watches(&self, before: DateTime<Utc>) -> DomainResult<Vec<SyncCursor>> {
        Ok(self
            .cursors
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.watch_expires_at.map_or(true, |at| at < before))
            .cloned()
            .collect())
    }
}
