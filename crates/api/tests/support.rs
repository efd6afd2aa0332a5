#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use slotline_api::{router, AppContext};
use slotline_common::time::MockClock;
use slotline_domain::{
    Config, DatabaseConfig, GoogleConfig, LoggingConfig, MailSyncConfig, Provider,
    SchedulingConfig, SecurityConfig, ServerConfig, TokenGrant,
};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

pub const WEBHOOK_SECRET: &str = "push-secret";
pub const USER: &str = "user-1";

/// Service wired to a temporary database and a mock Google server.
pub struct TestApp {
    pub server: MockServer,
    pub context: Arc<AppContext>,
    pub clock: MockClock,
    _temp_dir: TempDir,
}

pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start with a config tweak applied before the context is built.
    pub async fn start_with(customize: impl FnOnce(&mut Config)) -> Self {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().expect("temp dir should be created");

        let mut google = GoogleConfig::with_client("client-id", "client-secret");
        google.token_url = format!("{}/token", server.uri());
        google.gmail_api_base = format!("{}/gmail/v1", server.uri());
        google.calendar_api_base = format!("{}/calendar/v3", server.uri());
        google.redirect_uri = Some("https://app.example.com/oauth/callback".into());
        google.request_timeout_secs = 5;

        let mut config = Config {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                path: temp_dir.path().join("slotline.db").to_string_lossy().into_owned(),
                pool_size: 2,
            },
            security: SecurityConfig {
                token_encryption_key: "api test passphrase".into(),
                token_key_salt: "api-test-salt".into(),
                webhook_secret: WEBHOOK_SECRET.into(),
            },
            google,
            scheduling: SchedulingConfig::default(),
            mail_sync: MailSyncConfig { message_timeout_secs: 5, ..MailSyncConfig::default() },
            logging: LoggingConfig::default(),
        };

        customize(&mut config);

        let clock = MockClock::at(monday_morning());
        let context = AppContext::with_clock(config, Arc::new(clock.clone()))
            .expect("context should build");

        Self { server, context: Arc::new(context), clock, _temp_dir: temp_dir }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.context))
    }

    pub async fn connect(&self, provider: Provider, access_token: &str) {
        let grant = TokenGrant {
            access_token: access_token.into(),
            refresh_token: Some("1//refresh".into()),
            expires_in: 3600,
            scope: None,
        };
        self.context.credentials.save_authorization(USER, provider, &grant).await.unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        read_json(self.router().oneshot(request).await.unwrap()).await
    }
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

pub fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}
