//! Google OAuth token endpoint.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use slotline_core::TokenEndpoint;
use slotline_domain::{GoogleConfig, Provider, Result, SlotlineError, TokenGrant};
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Error body returned by the token endpoint on rejection.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchanges authorization codes and refresh tokens at Google's token
/// endpoint. Mail and calendar share one OAuth client. Grants are requested
/// once; a failed refresh is never retried.
pub struct GoogleTokenEndpoint {
    http: HttpClient,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleTokenEndpoint {
    pub fn new(http: HttpClient, config: &GoogleConfig) -> Self {
        Self {
            http: http.single_attempt(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    async fn request_grant(&self, params: &[(&str, &str)]) -> Result<TokenGrant> {
        let request = self.http.request(Method::POST, &self.token_url).form(params);
        let response = self.http.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            return Err(SlotlineError::Auth(format!("token endpoint rejected grant ({reason})")));
        }

        response.json::<TokenGrant>().await.map_err(|err| SlotlineError::from(InfraError::from(err)))
    }
}

#[async_trait]
impl TokenEndpoint for GoogleTokenEndpoint {
    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, provider: Provider, refresh_token: &str) -> Result<TokenGrant> {
        let grant = self
            .request_grant(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .await?;
        debug!(%provider, expires_in = grant.expires_in, rotated = grant.refresh_token.is_some(), "refresh grant received");
        Ok(grant)
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, provider: Provider, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
        let grant = self
            .request_grant(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;
        debug!(%provider, has_refresh_token = grant.refresh_token.is_some(), "authorization code exchanged");
        Ok(grant)
    }
}
