//! Turning a fetched provider message into a storable row.

use chrono::{DateTime, Utc};
use slotline_domain::{MailMessage, MailSyncConfig, MimePart, NewMessage};

use super::html::{decode_entities, html_to_plain_text};

const NO_SUBJECT: &str = "(no subject)";

/// Sender parsed from a `From` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub name: Option<String>,
    pub email: String,
}

/// Parse `"Display Name" <addr>`, `Name <addr>` or a bare address.
pub fn parse_from(raw: &str) -> Sender {
    let raw = raw.trim();

    if let (Some(open), Some(close)) = (raw.rfind('<'), raw.rfind('>')) {
        if open < close {
            let name = raw[..open].trim().trim_matches('"').trim();
            let email = raw[open + 1..close].trim();
            return Sender {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: email.to_string(),
            };
        }
    }

    Sender { name: None, email: raw.to_string() }
}

/// Parse an RFC 2822 `Date` header, tolerating a trailing `(TZ)` comment.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let mut value = raw.trim();
    if value.ends_with(')') {
        if let Some(open) = value.rfind('(') {
            value = value[..open].trim_end();
        }
    }
    DateTime::parse_from_rfc2822(value).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Pick the readable body: the first text/plain part anywhere in the tree,
/// otherwise the first text/html part converted to text.
pub fn select_body(part: &MimePart) -> Option<String> {
    if let Some(text) = find_part(part, "text/plain") {
        return Some(text.trim().to_string());
    }
    find_part(part, "text/html").map(html_to_plain_text)
}

fn find_part<'a>(part: &'a MimePart, mime: &str) -> Option<&'a str> {
    if part.mime_type.to_ascii_lowercase().starts_with(mime) {
        if let Some(body) = part.body.as_deref().filter(|b| !b.trim().is_empty()) {
            return Some(body);
        }
    }
    part.parts.iter().find_map(|child| find_part(child, mime))
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the row for a fetched message.
///
/// Received time comes from the `Date` header, then the provider's internal
/// date, then `now`.
pub fn to_new_message(
    user_id: &str,
    message: &MailMessage,
    settings: &MailSyncConfig,
    now: DateTime<Utc>,
) -> NewMessage {
    let headers = &message.payload;
    let sender = parse_from(headers.header("From").unwrap_or_default());
    let subject = headers
        .header("Subject")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_SUBJECT)
        .to_string();
    let received_at = headers
        .header("Date")
        .and_then(parse_date)
        .or(message.internal_date)
        .unwrap_or(now);

    let body = select_body(&message.payload)
        .filter(|b| !b.is_empty())
        .or_else(|| message.snippet.as_deref().map(decode_entities))
        .unwrap_or_default();

    let flattened = body.split_whitespace().collect::<Vec<_>>().join(" ");

    NewMessage {
        user_id: user_id.to_string(),
        provider_message_id: message.id.clone(),
        thread_id: message.thread_id.clone(),
        subject,
        from_name: sender.name,
        from_email: sender.email,
        body_snippet: truncate_chars(&flattened, settings.snippet_chars).to_string(),
        body_full: truncate_chars(&body, settings.body_max_chars).to_string(),
        received_at,
    }
}
