//! Shared fixtures for infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use slotline_common::time::MockClock;
use slotline_core::{CredentialStore, TokenLifecycleManager};
use slotline_domain::{GoogleConfig, SecurityConfig};
use slotline_infra::{
    AesTokenCipher, DbManager, GoogleTokenEndpoint, HttpClient, SqliteCredentialRepository,
};
use tempfile::TempDir;

/// 64 hex characters: used as a raw AES-256 key, skipping Argon2.
pub const TEST_TOKEN_KEY: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

/// Temporary database that keeps its directory alive for the test.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::open(temp_dir.path().join("slotline-test.db"), 4)
            .expect("database should open with schema applied");
        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
}

pub fn security() -> SecurityConfig {
    SecurityConfig {
        token_encryption_key: TEST_TOKEN_KEY.into(),
        token_key_salt: "slotline-test-salt".into(),
        webhook_secret: "hook-secret".into(),
    }
}

pub fn fast_http() -> HttpClient {
    HttpClient::builder()
        .base_backoff(Duration::from_millis(1))
        .timeout(Duration::from_secs(5))
        .build()
        .expect("http client should build")
}

/// Credential store and token lifecycle backed by SQLite, sealing with the
/// test key and refreshing against `token_url`.
pub struct TokenStack {
    pub clock: MockClock,
    pub store: Arc<CredentialStore>,
    pub tokens: Arc<TokenLifecycleManager>,
}

impl TokenStack {
    pub fn new(db: &TestDatabase, token_url: String, now: DateTime<Utc>) -> Self {
        let clock = MockClock::at(now);
        let cipher = AesTokenCipher::from_config(&security()).expect("cipher should build");
        let store = Arc::new(CredentialStore::new(
            Arc::new(SqliteCredentialRepository::new(Arc::clone(&db.manager))),
            Arc::new(cipher),
            Arc::new(clock.clone()),
        ));

        let mut google = GoogleConfig::with_client("client-id", "client-secret");
        google.token_url = token_url;
        let endpoint = GoogleTokenEndpoint::new(fast_http(), &google);

        let tokens = Arc::new(TokenLifecycleManager::new(
            Arc::clone(&store),
            Arc::new(endpoint),
            Arc::new(clock.clone()),
        ));

        Self { clock, store, tokens }
    }
}
