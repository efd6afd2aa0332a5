//! Credential store: seals tokens on the way in and opens them on the way
//! out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use slotline_common::time::Clock;
use slotline_domain::{
    ConnectionStatus, Credential, Provider, Result, StoredCredential, TokenGrant,
};
use tracing::{info, instrument, warn};

use super::ports::{CredentialRepository, TokenCipher};

/// Credential persistence with at-rest encryption.
pub struct CredentialStore {
    repository: Arc<dyn CredentialRepository>,
    cipher: Arc<dyn TokenCipher>,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    pub fn new(
        repository: Arc<dyn CredentialRepository>,
        cipher: Arc<dyn TokenCipher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repository, cipher, clock }
    }

    /// Persist the result of a successful authorization handshake.
    ///
    /// Providers only return a refresh token on first consent, so an existing
    /// refresh token is kept when the grant carries none.
    #[instrument(skip(self, grant))]
    pub async fn save_authorization(
        &self,
        user_id: &str,
        provider: Provider,
        grant: &TokenGrant,
    ) -> Result<Credential> {
        let now = self.clock.now();
        let expires_at = expiry_from(now, grant.expires_in);

        let refresh_token_enc = match grant.refresh_token.as_deref() {
            Some(token) => Some(self.cipher.seal(token)?),
            None => self
                .repository
                .find(user_id, provider)
                .await?
                .and_then(|existing| existing.refresh_token_enc),
        };
        let has_refresh_token = refresh_token_enc.is_some();

        self.repository
            .upsert(StoredCredential {
                user_id: user_id.to_string(),
                provider,
                access_token_enc: Some(self.cipher.seal(&grant.access_token)?),
                refresh_token_enc: refresh_token_enc.clone(),
                expires_at,
                status: ConnectionStatus::Connected,
                updated_at: now,
            })
            .await?;

        info!(user_id, %provider, has_refresh_token, %expires_at, "credential connected");

        Ok(Credential {
            user_id: user_id.to_string(),
            provider,
            access_token: grant.access_token.clone(),
            refresh_token: match (grant.refresh_token.clone(), refresh_token_enc) {
                (Some(token), _) => Some(token),
                (None, Some(sealed)) => Some(self.open_secret(&sealed, user_id, provider)),
                (None, None) => None,
            },
            expires_at,
            updated_at: now,
        })
    }

    /// Load and open the credential for `(user_id, provider)`.
    ///
    /// Missing and disconnected credentials both yield `None`.
    pub async fn load(&self, user_id: &str, provider: Provider) -> Result<Option<Credential>> {
        let Some(stored) = self.repository.find(user_id, provider).await? else {
            return Ok(None);
        };

        if stored.status == ConnectionStatus::Disconnected {
            return Ok(None);
        }
        let Some(access_token_enc) = stored.access_token_enc.as_deref() else {
            warn!(user_id, %provider, "connected credential has no access token");
            return Ok(None);
        };

        Ok(Some(Credential {
            user_id: stored.user_id.clone(),
            provider,
            access_token: self.open_secret(access_token_enc, user_id, provider),
            refresh_token: stored
                .refresh_token_enc
                .as_deref()
                .map(|sealed| self.open_secret(sealed, user_id, provider)),
            expires_at: stored.expires_at,
            updated_at: stored.updated_at,
        }))
    }

    /// Persist a refreshed grant and return the new expiry.
    pub async fn store_refreshed(
        &self,
        user_id: &str,
        provider: Provider,
        grant: &TokenGrant,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let expires_at = expiry_from(now, grant.expires_in);
        let access_token_enc = self.cipher.seal(&grant.access_token)?;
        let refresh_token_enc =
            grant.refresh_token.as_deref().map(|token| self.cipher.seal(token)).transpose()?;

        self.repository
            .update_access_token(
                user_id,
                provider,
                access_token_enc,
                refresh_token_enc,
                expires_at,
                now,
            )
            .await?;

        Ok(expires_at)
    }

    /// Revoke the local credential.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, user_id: &str, provider: Provider) -> Result<()> {
        self.repository.mark_disconnected(user_id, provider, self.clock.now()).await?;
        info!(user_id, %provider, "credential disconnected");
        Ok(())
    }

    /// Open a sealed secret, falling back to the raw value for rows written
    /// before encryption at rest was introduced.
    fn open_secret(&self, sealed: &str, user_id: &str, provider: Provider) -> String {
        match self.cipher.open(sealed) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                warn!(user_id, %provider, error = %err, "stored token is not sealed; using it as plaintext");
                sealed.to_string()
            }
        }
    }
}

fn expiry_from(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    now + Duration::seconds(expires_in.max(0))
}
