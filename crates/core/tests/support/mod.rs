//! Shared test helpers for `slotline-core` integration tests.
//!
//! In-memory ports plus a [`Harness`] that wires the credential store and
//! token lifecycle manager against a pinned clock.

#![allow(dead_code)]

pub mod providers;
pub mod repositories;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use slotline_common::time::{Clock, MockClock};
use slotline_core::{CredentialStore, TokenLifecycleManager};
use slotline_domain::{ConnectionStatus, Provider, StoredCredential};

use self::providers::{FakeTokenEndpoint, PrefixCipher};
use self::repositories::MockCredentialRepository;

/// Monday 3 June 2024, 08:00 UTC.
pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
}

/// Credential plumbing shared by every service under test.
pub struct Harness {
    pub clock: MockClock,
    pub credentials: MockCredentialRepository,
    pub endpoint: Arc<FakeTokenEndpoint>,
    pub store: Arc<CredentialStore>,
    pub tokens: Arc<TokenLifecycleManager>,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        let clock = MockClock::at(now);
        let credentials = MockCredentialRepository::default();
        let endpoint = Arc::new(FakeTokenEndpoint::default());

        let store = Arc::new(CredentialStore::new(
            Arc::new(credentials.clone()),
            Arc::new(PrefixCipher),
            Arc::new(clock.clone()),
        ));
        let tokens = Arc::new(TokenLifecycleManager::new(
            store.clone(),
            endpoint.clone(),
            Arc::new(clock.clone()),
        ));

        Self { clock, credentials, endpoint, store, tokens }
    }

    /// Seed a connected credential whose secrets are sealed by [`PrefixCipher`].
    pub fn connect(
        &self,
        user_id: &str,
        provider: Provider,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) {
        self.credentials.insert(StoredCredential {
            user_id: user_id.to_string(),
            provider,
            access_token_enc: Some(PrefixCipher::sealed(access_token)),
            refresh_token_enc: refresh_token.map(PrefixCipher::sealed),
            expires_at,
            status: ConnectionStatus::Connected,
            updated_at: self.clock.now(),
        });
    }

    /// Seed a row as written before encryption at rest existed.
    pub fn connect_plaintext(
        &self,
        user_id: &str,
        provider: Provider,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) {
        self.credentials.insert(StoredCredential {
            user_id: user_id.to_string(),
            provider,
            access_token_enc: Some(access_token.to_string()),
            refresh_token_enc: Some(refresh_token.to_string()),
            expires_at,
            status: ConnectionStatus::Connected,
            updated_at: self.clock.now(),
        });
    }
}
