//! Refresh-or-return access token resolution.
//!
//! Concurrent callers that both find a token near expiry will both refresh
//! and both persist. The provider keeps honouring the older access token for
//! a short grace window and the store always ends up holding a valid token,
//! so no lock is taken here.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use slotline_common::time::Clock;
use slotline_domain::constants::TOKEN_REFRESH_THRESHOLD_SECS;
use slotline_domain::{Credential, Provider, Result, SlotlineError, ValidAccessToken};
use tracing::{debug, info, instrument, warn};

use super::ports::TokenEndpoint;
use super::store::CredentialStore;

/// Whether a token expiring at `expires_at` must be refreshed at `now`.
pub fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now >= expires_at - threshold
}

/// Hands out usable access tokens, refreshing through the provider when the
/// cached one is within the refresh threshold of expiry.
pub struct TokenLifecycleManager {
    store: Arc<CredentialStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    refresh_threshold: Duration,
}

impl TokenLifecycleManager {
    pub fn new(
        store: Arc<CredentialStore>,
        endpoint: Arc<dyn TokenEndpoint>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            endpoint,
            clock,
            refresh_threshold: Duration::seconds(TOKEN_REFRESH_THRESHOLD_SECS),
        }
    }

    /// Override the refresh threshold.
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Load the user's credential and resolve a valid token from it.
    ///
    /// # Errors
    /// `NeedsReconnect` when no connected credential exists, when it has no
    /// refresh token and is near expiry, or when the provider refuses the
    /// refresh.
    #[instrument(skip(self))]
    pub async fn get_valid_access_token(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<ValidAccessToken> {
        let Some(credential) = self.store.load(user_id, provider).await? else {
            debug!(user_id, %provider, "no connected credential");
            return Err(SlotlineError::NeedsReconnect(provider));
        };
        self.resolve(&credential).await
    }

    /// Return the cached token or refresh it.
    pub async fn resolve(&self, credential: &Credential) -> Result<ValidAccessToken> {
        let now = self.clock.now();
        let provider = credential.provider;
        let user_id = credential.user_id.as_str();

        if !needs_refresh(credential.expires_at, now, self.refresh_threshold) {
            return Ok(ValidAccessToken { token: credential.access_token.clone(), refreshed: false });
        }

        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            warn!(user_id, %provider, "access token expiring and no refresh token stored");
            return Err(SlotlineError::NeedsReconnect(provider));
        };

        let grant = match self.endpoint.refresh(provider, refresh_token).await {
            Ok(grant) => grant,
            Err(err) => {
                warn!(user_id, %provider, error = %err, "token refresh failed");
                return Err(SlotlineError::NeedsReconnect(provider));
            }
        };

        let expires_at = self.store.store_refreshed(user_id, provider, &grant, now).await?;
        info!(user_id, %provider, %expires_at, "access token refreshed");

        Ok(ValidAccessToken { token: grant.access_token, refreshed: true })
    }
}
