//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use slotline_common::time::{Clock, SystemClock};
use slotline_core::{
    AvailabilityService, CredentialStore, MailboxSynchronizer, TokenEndpoint,
    TokenLifecycleManager,
};
use slotline_domain::{Config, Result, SlotlineError};
use slotline_infra::{
    AesTokenCipher, DbManager, GmailClient, GoogleCalendarClient, GoogleTokenEndpoint, HttpClient,
    SqliteCredentialRepository, SqliteMessageRepository, SqlitePolicyRepository,
    SqliteSyncCursorRepository,
};
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub credentials: Arc<CredentialStore>,
    pub token_endpoint: Arc<dyn TokenEndpoint>,
    pub availability: Arc<AvailabilityService>,
    pub mailbox: Arc<MailboxSynchronizer>,
    webhook_secret_digest: [u8; 32],
}

impl AppContext {
    /// Wire every adapter from `config` using the system clock.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppContext::new`] with an injected clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.security.webhook_secret.trim().is_empty() {
            return Err(SlotlineError::Config("security.webhook_secret must be set".to_string()));
        }

        let db = Arc::new(DbManager::open(&config.database.path, config.database.pool_size)?);
        let cipher = AesTokenCipher::from_config(&config.security)?;
        info!(key_fingerprint = %cipher.key_fingerprint(), "token cipher ready");

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.google.request_timeout_secs))
            .build()?;

        let credentials = Arc::new(CredentialStore::new(
            Arc::new(SqliteCredentialRepository::new(Arc::clone(&db))),
            Arc::new(cipher),
            Arc::clone(&clock),
        ));
        let token_endpoint: Arc<dyn TokenEndpoint> =
            Arc::new(GoogleTokenEndpoint::new(http.clone(), &config.google));
        let tokens = Arc::new(TokenLifecycleManager::new(
            Arc::clone(&credentials),
            Arc::clone(&token_endpoint),
            Arc::clone(&clock),
        ));

        let availability = Arc::new(AvailabilityService::new(
            Arc::clone(&tokens),
            Arc::new(GoogleCalendarClient::new(http.clone(), &config.google.calendar_api_base)),
            Arc::new(SqlitePolicyRepository::new(Arc::clone(&db))),
            config.scheduling.default_policy()?,
            Arc::clone(&clock),
        ));

        let mut mailbox = MailboxSynchronizer::new(
            tokens,
            Arc::new(GmailClient::new(http, &config.google.gmail_api_base)),
            Arc::new(SqliteMessageRepository::new(Arc::clone(&db))),
            Arc::new(SqliteSyncCursorRepository::new(Arc::clone(&db))),
            clock,
        )
        .with_settings(config.mail_sync.clone());
        if let Some(topic) = config.google.pubsub_topic.as_deref() {
            mailbox = mailbox.with_watch_topic(topic);
        }

        let webhook_secret_digest = digest(&config.security.webhook_secret);

        info!(
            database = %db.path().display(),
            watch_topic = config.google.pubsub_topic.is_some(),
            "application context initialized"
        );

        Ok(Self {
            config,
            db,
            credentials,
            token_endpoint,
            availability,
            mailbox: Arc::new(mailbox),
            webhook_secret_digest,
        })
    }

    /// Compare a presented webhook secret with the configured one.
    ///
    /// Both sides are hashed first so the comparison runs over equal-length
    /// input and never exits at the first differing byte.
    pub fn verify_webhook_secret(&self, presented: &str) -> bool {
        let presented = digest(presented);
        let diff = presented
            .iter()
            .zip(self.webhook_secret_digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        diff == 0
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
