//! Gmail v1 wire types and their conversion into domain messages.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::engine::GeneralPurpose;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotline_domain::types::mailbox::u64_from_number_or_string;
use slotline_domain::{MailMessage, MessageHeader, MimePart};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    pub snippet: Option<String>,
    /// Epoch milliseconds, sent as a string.
    pub internal_date: Option<String>,
    pub payload: Option<GmailPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailPart {
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
    pub body: Option<GmailBody>,
    #[serde(default)]
    pub parts: Vec<GmailPart>,
}

#[derive(Debug, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailBody {
    pub data: Option<String>,
    pub attachment_id: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub history_id: u64,
    pub next_page_token: Option<String>,
}

fn optional_history_id<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    u64_from_number_or_string(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default, deserialize_with = "optional_history_id")]
    pub id: Option<u64>,
    #[serde(default)]
    pub messages_added: Vec<MessageAdded>,
}

#[derive(Debug, Deserialize)]
pub struct MessageAdded {
    pub message: MessageRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub email_address: String,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub history_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRequest<'a> {
    pub topic_name: &'a str,
    pub label_ids: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchResponse {
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub history_id: u64,
    /// Epoch milliseconds.
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub expiration: u64,
}

impl WatchResponse {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.expiration).ok().and_then(DateTime::from_timestamp_millis)
    }
}

impl GmailMessage {
    pub fn into_mail_message(self) -> MailMessage {
        let internal_date = self
            .internal_date
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);

        MailMessage {
            id: self.id,
            thread_id: self.thread_id,
            label_ids: self.label_ids,
            snippet: self.snippet,
            internal_date,
            payload: self.payload.map(GmailPart::into_mime_part).unwrap_or_default(),
        }
    }
}

impl GmailPart {
    fn into_mime_part(self) -> MimePart {
        let mime_type = self.mime_type.unwrap_or_default();
        // Only inline text bodies are decoded; attachments arrive by id.
        let body = if mime_type.to_ascii_lowercase().starts_with("text/") {
            self.body.and_then(|b| b.data).as_deref().and_then(decode_body)
        } else {
            None
        };

        MimePart {
            mime_type,
            headers: self.headers.into_iter().map(|h| MessageHeader::new(h.name, h.value)).collect(),
            body,
            parts: self.parts.into_iter().map(GmailPart::into_mime_part).collect(),
        }
    }
}

/// Gmail sends URL-safe base64 but padding varies between parts.
pub fn decode_body(data: &str) -> Option<String> {
    let decoders: [&GeneralPurpose; 4] = [&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    decoders.iter().find_map(|engine| {
        engine.decode(data.trim()).ok().and_then(|bytes| String::from_utf8(bytes).ok())
    })
}
