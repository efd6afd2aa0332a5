//! Fake provider-side ports: cipher, token endpoint, mail and calendar APIs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotline_core::{CalendarProvider, MailProvider, TokenCipher, TokenEndpoint};
use slotline_domain::{
    BusyInterval, HistoryDelta, MailMessage, MailboxProfile, MessageHeader, MimePart, Provider,
    Result as DomainResult, SlotlineError, TokenGrant, WatchRegistration,
};

/// Reversible "cipher" that tags sealed values with `enc:`. Anything without
/// the tag fails to open, like plaintext under the real cipher.
pub struct PrefixCipher;

impl PrefixCipher {
    pub fn sealed(plaintext: &str) -> String {
        format!("enc:{plaintext}")
    }
}

impl TokenCipher for PrefixCipher {
    fn seal(&self, plaintext: &str) -> DomainResult<String> {
        Ok(Self::sealed(plaintext))
    }

    fn open(&self, sealed: &str) -> DomainResult<String> {
        sealed
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| SlotlineError::Security("value is not sealed".to_string()))
    }
}

/// Token endpoint returning a scripted grant (or error) and recording calls.
#[derive(Default)]
pub struct FakeTokenEndpoint {
    response: Mutex<Option<DomainResult<TokenGrant>>>,
    refresh_calls: Mutex<Vec<(Provider, String)>>,
    exchange_calls: Mutex<Vec<(Provider, String, String)>>,
}

impl FakeTokenEndpoint {
    pub fn respond_with(&self, grant: TokenGrant) {
        *self.response.lock().unwrap() = Some(Ok(grant));
    }

    pub fn fail_with(&self, error: SlotlineError) {
        *self.response.lock().unwrap() = Some(Err(error));
    }

    pub fn refresh_calls(&self) -> Vec<(Provider, String)> {
        self.refresh_calls.lock().unwrap().clone()
    }

    pub fn exchange_calls(&self) -> Vec<(Provider, String, String)> {
        self.exchange_calls.lock().unwrap().clone()
    }

    fn next(&self) -> DomainResult<TokenGrant> {
        self.response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(SlotlineError::Internal("no scripted grant".to_string())))
    }
}

#[async_trait]
impl TokenEndpoint for FakeTokenEndpoint {
    async fn refresh(&self, provider: Provider, refresh_token: &str) -> DomainResult<TokenGrant> {
        self.refresh_calls.lock().unwrap().push((provider, refresh_token.to_string()));
        self.next()
    }

    async fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
        redirect_uri: &str,
    ) -> DomainResult<TokenGrant> {
        self.exchange_calls.lock().unwrap().push((
            provider,
            code.to_string(),
            redirect_uri.to_string(),
        ));
        self.next()
    }
}

pub fn grant(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_in,
        scope: None,
    }
}

/// Build a single-part text/plain message.
pub fn plain_message(id: &str, subject: &str, body: &str) -> MailMessage {
    MailMessage {
        id: id.to_string(),
        thread_id: Some(format!("thread-{id}")),
        label_ids: vec!["INBOX".to_string()],
        snippet: Some(body.chars().take(40).collect()),
        internal_date: None,
        payload: MimePart {
            mime_type: "text/plain".to_string(),
            headers: vec![
                MessageHeader::new("From", "Ada Lovelace <ada@example.com>"),
                MessageHeader::new("Subject", subject),
                MessageHeader::new("Date", "Mon, 3 Jun 2024 07:30:00 +0000"),
            ],
            body: Some(body.to_string()),
            parts: Vec::new(),
        },
    }
}

/// Scriptable mail API.
#[derive(Default)]
pub struct FakeMailProvider {
    listings: Mutex<HashMap<String, Vec<String>>>,
    messages: Mutex<HashMap<String, MailMessage>>,
    history: Mutex<Option<DomainResult<HistoryDelta>>>,
    slow: Mutex<HashSet<String>>,
    broken: Mutex<HashSet<String>>,
    profile: Mutex<Option<MailboxProfile>>,
    watch: Mutex<Option<WatchRegistration>>,
    list_calls: Mutex<Vec<(String, usize)>>,
    history_calls: Mutex<Vec<u64>>,
    fetched: Mutex<Vec<String>>,
    watch_topics: Mutex<Vec<String>>,
    tokens_seen: Mutex<Vec<String>>,
}

impl FakeMailProvider {
    pub fn with_message(&self, message: MailMessage) -> &Self {
        self.messages.lock().unwrap().insert(message.id.clone(), message);
        self
    }

    pub fn list_for(&self, query: &str, ids: &[&str]) -> &Self {
        self.listings
            .lock()
            .unwrap()
            .insert(query.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn history_returns(&self, result: DomainResult<HistoryDelta>) -> &Self {
        *self.history.lock().unwrap() = Some(result);
        self
    }

    /// Fetching this id never completes within any sensible timeout.
    pub fn stall_on(&self, id: &str) -> &Self {
        self.slow.lock().unwrap().insert(id.to_string());
        self
    }

    /// Fetching this id fails with a transient network error.
    pub fn fail_on(&self, id: &str) -> &Self {
        self.broken.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn with_profile(&self, email_address: &str, history_id: u64) -> &Self {
        *self.profile.lock().unwrap() =
            Some(MailboxProfile { email_address: email_address.to_string(), history_id });
        self
    }

    pub fn with_watch(&self, history_id: u64, expires_at: DateTime<Utc>) -> &Self {
        *self.watch.lock().unwrap() = Some(WatchRegistration { history_id, expires_at });
        self
    }

    pub fn list_calls(&self) -> Vec<(String, usize)> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn history_calls(&self) -> Vec<u64> {
        self.history_calls.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn watch_topics(&self) -> Vec<String> {
        self.watch_topics.lock().unwrap().clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    fn saw(&self, token: &str) {
        self.tokens_seen.lock().unwrap().push(token.to_string());
    }
}

#[async_trait]
impl MailProvider for FakeMailProvider {
    async fn list_message_ids(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
    ) -> DomainResult<Vec<String>> {
        self.saw(access_token);
        self.list_calls.lock().unwrap().push((query.to_string(), max_results));
        let mut ids = self.listings.lock().unwrap().get(query).cloned().unwrap_or_default();
        ids.truncate(max_results);
        Ok(ids)
    }

    async fn get_message(&self, access_token: &str, message_id: &str) -> DomainResult<MailMessage> {
        self.saw(access_token);
        self.fetched.lock().unwrap().push(message_id.to_string());

        let stalled = self.slow.lock().unwrap().contains(message_id);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.broken.lock().unwrap().contains(message_id) {
            return Err(SlotlineError::Network(format!("fetch {message_id} failed")));
        }

        self.messages
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .ok_or_else(|| SlotlineError::NotFound(format!("message {message_id}")))
    }

    async fn list_history(
        &self,
        access_token: &str,
        start_history_id: u64,
    ) -> DomainResult<HistoryDelta> {
        self.saw(access_token);
        self.history_calls.lock().unwrap().push(start_history_id);
        self.history
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(HistoryDelta { message_ids: Vec::new(), history_id: start_history_id }))
    }

    async fn get_profile(&self, access_token: &str) -> DomainResult<MailboxProfile> {
        self.saw(access_token);
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SlotlineError::NotFound("profile".to_string()))
    }

    async fn watch(&self, access_token: &str, topic: &str) -> DomainResult<WatchRegistration> {
        self.saw(access_token);
        self.watch_topics.lock().unwrap().push(topic.to_string());
        let registration = *self.watch.lock().unwrap();
        registration.ok_or_else(|| SlotlineError::Network("watch rejected".to_string()))
    }
}

/// Calendar API returning fixed busy intervals and recording query windows.
#[derive(Default)]
pub struct FakeCalendarProvider {
    busy: Mutex<Vec<BusyInterval>>,
    windows: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
}

impl FakeCalendarProvider {
    pub fn with_busy(busy: Vec<BusyInterval>) -> Self {
        Self { busy: Mutex::new(busy), windows: Mutex::default() }
    }

    /// `(access_token, from, to)` for every lookup.
    pub fn windows(&self) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendarProvider {
    async fn busy_intervals(
        &self,
        access_token: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<BusyInterval>> {
        self.windows.lock().unwrap().push((access_token.to_string(), from, to));
        Ok(self.busy.lock().unwrap().clone())
    }
}
