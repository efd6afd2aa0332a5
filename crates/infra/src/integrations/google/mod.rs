//! Google adapters: OAuth token endpoint, Gmail, Calendar free/busy and the
//! Pub/Sub push envelope.

pub mod calendar;
pub mod gmail;
pub mod gmail_types;
pub mod oauth;
pub mod pubsub;

pub use calendar::GoogleCalendarClient;
pub use gmail::GmailClient;
pub use oauth::GoogleTokenEndpoint;
pub use pubsub::{PushEnvelope, PushMessage};

use reqwest::Response;
use slotline_domain::{Provider, SlotlineError};

use crate::http::client::status_error;

/// Map a failed provider response to a domain error. A rejected bearer token
/// means the stored credential is no longer usable.
pub(crate) async fn provider_error(provider: Provider, response: Response) -> SlotlineError {
    match status_error(response).await {
        SlotlineError::Auth(_) => SlotlineError::NeedsReconnect(provider),
        other => other,
    }
}
