//! Gmail v1 adapter for [`MailProvider`].

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use slotline_core::MailProvider;
use slotline_domain::{
    HistoryDelta, MailMessage, MailboxProfile, Provider, Result, SlotlineError, WatchRegistration,
};
use tracing::{debug, instrument, warn};

use super::gmail_types::{
    GmailMessage, HistoryResponse, ListMessagesResponse, ProfileResponse, WatchRequest,
    WatchResponse,
};
use super::provider_error;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Largest page the list endpoint accepts.
const MAX_PAGE_SIZE: usize = 500;
/// Upper bound on history pages walked in one pass.
const MAX_HISTORY_PAGES: usize = 50;
const WATCH_LABELS: [&str; 1] = ["INBOX"];

pub struct GmailClient {
    http: HttpClient,
    base_url: String,
}

impl GmailClient {
    /// `base_url` is the API root, e.g. `https://gmail.googleapis.com/gmail/v1`.
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request =
            self.http.request(Method::GET, self.url(path)).bearer_auth(access_token).query(query);
        let response = self.http.send(request).await?;
        parse_json(response).await
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(provider_error(Provider::Mail, response).await);
    }
    response.json::<T>().await.map_err(|err| SlotlineError::from(InfraError::from(err)))
}

/// 404 means the start id is unknown; a 400 naming the start id means it is
/// older than the retained history.
fn is_stale_history(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    let lowered = body.to_ascii_lowercase();
    status == StatusCode::BAD_REQUEST && (lowered.contains("too old") || lowered.contains("starthistoryid"))
}

#[async_trait]
impl MailProvider for GmailClient {
    #[instrument(skip(self, access_token))]
    async fn list_message_ids(&self, access_token: &str, query: &str, max_results: usize) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < max_results {
            let page_size = (max_results - ids.len()).min(MAX_PAGE_SIZE);
            let mut params = vec![("q", query.to_string()), ("maxResults", page_size.to_string())];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let page: ListMessagesResponse = self.get_json(access_token, "messages", &params).await?;
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        ids.truncate(max_results);
        debug!(count = ids.len(), "listed message ids");
        Ok(ids)
    }

    async fn get_message(&self, access_token: &str, message_id: &str) -> Result<MailMessage> {
        let path = format!("messages/{}", urlencoding::encode(message_id));
        let message: GmailMessage =
            self.get_json(access_token, &path, &[("format", "full".to_string())]).await?;
        Ok(message.into_mail_message())
    }

    /// Walk history pages from `start_history_id`.
    ///
    /// A complete walk reports the mailbox's latest history id. When the page
    /// cap is reached with pages still pending, only the highest record id
    /// actually read is reported, so the next pass resumes from there.
    #[instrument(skip(self, access_token))]
    async fn list_history(&self, access_token: &str, start_history_id: u64) -> Result<HistoryDelta> {
        let mut message_ids = Vec::new();
        let mut latest = start_history_id;
        let mut consumed = start_history_id;
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        let history_id = loop {
            let mut params = vec![
                ("startHistoryId", start_history_id.to_string()),
                ("historyTypes", "messageAdded".to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let request = self
                .http
                .request(Method::GET, self.url("history"))
                .bearer_auth(access_token)
                .query(&params);
            let response = self.http.send(request).await?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
                let body = response.text().await.unwrap_or_default();
                if is_stale_history(status, &body) {
                    return Err(SlotlineError::StaleCursor(format!(
                        "history {start_history_id} rejected with HTTP {}",
                        status.as_u16()
                    )));
                }
                return Err(SlotlineError::InvalidInput(format!("HTTP {}: {}", status.as_u16(), body.trim())));
            }

            let page: HistoryResponse = parse_json(response).await?;
            pages += 1;
            latest = latest.max(page.history_id);
            for record in page.history {
                if let Some(id) = record.id {
                    consumed = consumed.max(id);
                }
                message_ids.extend(record.messages_added.into_iter().map(|added| added.message.id));
            }

            match page.next_page_token {
                None => break latest,
                Some(_) if pages >= MAX_HISTORY_PAGES => {
                    warn!(pages, resume_from = consumed, latest, "history walk truncated at page cap");
                    break consumed;
                }
                Some(token) => page_token = Some(token),
            }
        };

        debug!(added = message_ids.len(), history_id, "history delta fetched");
        Ok(HistoryDelta { message_ids, history_id })
    }

    async fn get_profile(&self, access_token: &str) -> Result<MailboxProfile> {
        let profile: ProfileResponse = self.get_json(access_token, "profile", &[]).await?;
        Ok(MailboxProfile { email_address: profile.email_address, history_id: profile.history_id })
    }

    #[instrument(skip(self, access_token))]
    async fn watch(&self, access_token: &str, topic: &str) -> Result<WatchRegistration> {
        let body = WatchRequest { topic_name: topic, label_ids: &WATCH_LABELS };
        let request =
            self.http.request(Method::POST, self.url("watch")).bearer_auth(access_token).json(&body);
        let response = self.http.send(request).await?;
        let watch: WatchResponse = parse_json(response).await?;

        let expires_at = watch.expires_at().ok_or_else(|| {
            SlotlineError::Network(format!("watch expiration {} is out of range", watch.expiration))
        })?;
        Ok(WatchRegistration { history_id: watch.history_id, expires_at })
    }
}
