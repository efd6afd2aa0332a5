//! Ports for credential persistence, sealing and the provider token endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotline_domain::{Provider, Result, StoredCredential, TokenGrant};

/// Persistence for sealed credentials, keyed by `(user_id, provider)`.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn find(&self, user_id: &str, provider: Provider) -> Result<Option<StoredCredential>>;

    /// Insert or overwrite the credential for its `(user_id, provider)`.
    async fn upsert(&self, credential: StoredCredential) -> Result<()>;

    /// Persist a refreshed access token. `refresh_token_enc` replaces the
    /// stored refresh token only when `Some`.
    async fn update_access_token(
        &self,
        user_id: &str,
        provider: Provider,
        access_token_enc: String,
        refresh_token_enc: Option<String>,
        expires_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Flip status to `disconnected` and clear both secrets.
    async fn mark_disconnected(
        &self,
        user_id: &str,
        provider: Provider,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Authenticated symmetric cipher for tokens at rest.
pub trait TokenCipher: Send + Sync {
    fn seal(&self, plaintext: &str) -> Result<String>;

    fn open(&self, sealed: &str) -> Result<String>;
}

/// Provider OAuth token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a refresh token for a fresh access token.
    async fn refresh(&self, provider: Provider, refresh_token: &str) -> Result<TokenGrant>;

    /// Complete an authorization-code handshake.
    async fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant>;
}
