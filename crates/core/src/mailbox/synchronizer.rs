//! Mailbox synchronizer.
//!
//! Two entry points feed the message store:
//! - [`MailboxSynchronizer::sync`] lists recent inbox messages on demand.
//! - [`MailboxSynchronizer::sync_from_notification`] follows the provider's
//!   history from the stored cursor when a push notification arrives. When the
//!   provider no longer recognises the cursor, a bounded fallback imports the
//!   most recent unread primary messages and reseeds the cursor.
//!
//! Both paths insert idempotently on `(user_id, provider_message_id)`, so
//! replays and overlapping passes never create duplicates. Each message is
//! fetched under its own timeout; a slow or failing message is counted and
//! left for the next pass without aborting the rest.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use slotline_common::time::Clock;
use slotline_domain::constants::{FALLBACK_SYNC_QUERY, INBOX_SYNC_QUERY_EXCLUSIONS};
use slotline_domain::{
    MailSyncConfig, MailSyncReport, NotificationSyncReport, Provider, PushNotification, Result,
    SlotlineError, StoredMessage, SyncCursor, UpsertOutcome,
};
use tracing::{debug, info, instrument, warn};

use super::extract::to_new_message;
use super::ports::{MailProvider, MessageRepository, SyncCursorRepository};
use crate::credentials::TokenLifecycleManager;

/// Per-message outcome inside a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Imported {
    New,
    AlreadyStored,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    imported: usize,
    skipped: usize,
    failed: usize,
}

/// Imports mailbox messages for connected users.
pub struct MailboxSynchronizer {
    tokens: Arc<TokenLifecycleManager>,
    provider: Arc<dyn MailProvider>,
    messages: Arc<dyn MessageRepository>,
    cursors: Arc<dyn SyncCursorRepository>,
    clock: Arc<dyn Clock>,
    settings: MailSyncConfig,
    watch_topic: Option<String>,
}

impl MailboxSynchronizer {
    pub fn new(
        tokens: Arc<TokenLifecycleManager>,
        provider: Arc<dyn MailProvider>,
        messages: Arc<dyn MessageRepository>,
        cursors: Arc<dyn SyncCursorRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            provider,
            messages,
            cursors,
            clock,
            settings: MailSyncConfig::default(),
            watch_topic: None,
        }
    }

    pub fn with_settings(mut self, settings: MailSyncConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Topic that push notifications are published to.
    pub fn with_watch_topic(mut self, topic: impl Into<String>) -> Self {
        self.watch_topic = Some(topic.into());
        self
    }

    /// Query used by the on-demand pass.
    pub fn inbox_query(&self) -> String {
        format!("in:inbox newer_than:{}d {}", self.settings.recency_days, INBOX_SYNC_QUERY_EXCLUSIONS)
    }

    /// Import recent inbox messages for `user_id`.
    ///
    /// # Errors
    /// `NeedsReconnect` when no usable mail token exists; provider errors from
    /// the listing call. Per-message failures are counted, not returned.
    #[instrument(skip(self))]
    pub async fn sync(&self, user_id: &str) -> Result<MailSyncReport> {
        let token = self.tokens.get_valid_access_token(user_id, Provider::Mail).await?.token;

        let query = self.inbox_query();
        let ids = self.provider.list_message_ids(&token, &query, self.settings.max_messages).await?;
        debug!(user_id, listed = ids.len(), "inbox listing complete");

        let tally = self.import_all(user_id, &token, &ids).await;
        let report = MailSyncReport {
            listed: ids.len(),
            imported: tally.imported,
            skipped: tally.skipped,
            failed: tally.failed,
        };

        info!(
            user_id,
            listed = report.listed,
            imported = report.imported,
            skipped = report.skipped,
            failed = report.failed,
            "mailbox sync finished"
        );
        Ok(report)
    }

    /// Handle a push notification.
    ///
    /// Notifications for unknown addresses are discarded with an empty
    /// report. The cursor is always persisted when the pass completes: moved
    /// forward to the id the history walk reached on the incremental path
    /// (never past it to the notification's id), reseeded to the notification's
    /// history id after a stale-cursor fallback.
    #[instrument(skip(self, notification), fields(mail_address = %notification.email_address, history_id = notification.history_id))]
    pub async fn sync_from_notification(
        &self,
        notification: &PushNotification,
    ) -> Result<NotificationSyncReport> {
        let Some(cursor) = self.cursors.find_by_mail_address(&notification.email_address).await?
        else {
            debug!("no sync cursor for address; discarding notification");
            return Ok(NotificationSyncReport::default());
        };
        let user_id = cursor.user_id.as_str();
        let token = self.tokens.get_valid_access_token(user_id, Provider::Mail).await?.token;

        match self.provider.list_history(&token, cursor.history_id).await {
            Ok(delta) => {
                let ids = dedup_preserving_order(delta.message_ids);
                let tally = self.import_all(user_id, &token, &ids).await;
                let stored = self.cursors.advance(user_id, delta.history_id, self.clock.now()).await?;

                info!(
                    user_id,
                    imported = tally.imported,
                    skipped = tally.skipped,
                    failed = tally.failed,
                    from = cursor.history_id,
                    to = stored,
                    "incremental sync finished"
                );
                Ok(NotificationSyncReport {
                    imported: tally.imported,
                    skipped: tally.skipped,
                    failed: tally.failed,
                    history_id: Some(stored),
                    fell_back: false,
                })
            }
            Err(SlotlineError::StaleCursor(reason)) => {
                warn!(user_id, stale = cursor.history_id, %reason, "sync cursor is stale; running fallback import");

                let ids = self
                    .provider
                    .list_message_ids(&token, FALLBACK_SYNC_QUERY, self.settings.fallback_messages)
                    .await?;
                let tally = self.import_all(user_id, &token, &ids).await;
                self.cursors.reseed(user_id, notification.history_id, self.clock.now()).await?;

                info!(
                    user_id,
                    imported = tally.imported,
                    skipped = tally.skipped,
                    failed = tally.failed,
                    reseeded = notification.history_id,
                    "fallback sync finished"
                );
                Ok(NotificationSyncReport {
                    imported: tally.imported,
                    skipped: tally.skipped,
                    failed: tally.failed,
                    history_id: Some(notification.history_id),
                    fell_back: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Subscribe the user's mailbox to push notifications and make sure a
    /// cursor exists for it.
    ///
    /// An existing cursor keeps its history id; a new one starts at the
    /// position the provider reports for the watch.
    #[instrument(skip(self))]
    pub async fn register_watch(&self, user_id: &str) -> Result<SyncCursor> {
        let topic = self.watch_topic.as_deref().ok_or_else(|| {
            SlotlineError::Config("push topic is not configured".to_string())
        })?;
        let token = self.tokens.get_valid_access_token(user_id, Provider::Mail).await?.token;

        let profile = self.provider.get_profile(&token).await?;
        let registration = self.provider.watch(&token, topic).await?;
        let existing = self.cursors.find_by_user(user_id).await?;

        let cursor = SyncCursor {
            user_id: user_id.to_string(),
            mail_address: profile.email_address,
            history_id: existing.map_or(registration.history_id, |c| c.history_id),
            watch_expires_at: Some(registration.expires_at),
            updated_at: self.clock.now(),
        };
        self.cursors.upsert(cursor.clone()).await?;
        let cursor = self.cursors.find_by_user(user_id).await?.unwrap_or(cursor);

        info!(
            user_id,
            mail_address = %cursor.mail_address,
            history_id = cursor.history_id,
            expires_at = %registration.expires_at,
            "mailbox watch registered"
        );
        Ok(cursor)
    }

    /// Renew every watch expiring within `within`. Returns how many renewals
    /// succeeded; failures are logged and retried on the next sweep.
    pub async fn renew_expiring_watches(&self, within: Duration) -> Result<usize> {
        let before = self.clock.now() + within;
        let expiring = self.cursors.list_expiring_watches(before).await?;

        let mut renewed = 0;
        for cursor in expiring {
            match self.register_watch(&cursor.user_id).await {
                Ok(_) => renewed += 1,
                Err(err) => {
                    warn!(user_id = %cursor.user_id, error = %err, "watch renewal failed");
                }
            }
        }
        Ok(renewed)
    }

    pub async fn list_unprocessed(&self, user_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        self.messages.list_unprocessed(user_id, limit).await
    }

    pub async fn mark_processed(&self, user_id: &str, provider_message_ids: &[String]) -> Result<usize> {
        self.messages.mark_processed(user_id, provider_message_ids).await
    }

    /// Import `ids` sequentially in provider order.
    async fn import_all(&self, user_id: &str, token: &str, ids: &[String]) -> Tally {
        let limit = StdDuration::from_secs(self.settings.message_timeout_secs);
        let mut tally = Tally::default();

        for id in ids {
            match tokio::time::timeout(limit, self.import_one(user_id, token, id)).await {
                Ok(Ok(Imported::New)) => tally.imported += 1,
                Ok(Ok(Imported::AlreadyStored)) => tally.skipped += 1,
                Ok(Err(err)) => {
                    tally.failed += 1;
                    warn!(user_id, message_id = %id, error = %err, "message import failed");
                }
                Err(_) => {
                    tally.failed += 1;
                    warn!(user_id, message_id = %id, timeout_secs = limit.as_secs(), "message import timed out");
                }
            }
        }
        tally
    }

    async fn import_one(&self, user_id: &str, token: &str, message_id: &str) -> Result<Imported> {
        if self.messages.exists(user_id, message_id).await? {
            return Ok(Imported::AlreadyStored);
        }

        let message = self.provider.get_message(token, message_id).await?;
        let row = to_new_message(user_id, &message, &self.settings, self.clock.now());

        Ok(match self.messages.insert_if_absent(row).await? {
            UpsertOutcome::Inserted => Imported::New,
            UpsertOutcome::Duplicate => Imported::AlreadyStored,
        })
    }
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
