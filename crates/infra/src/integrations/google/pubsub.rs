//! Pub/Sub push envelope carrying Gmail change notifications.

use std::collections::HashMap;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::Deserialize;
use slotline_domain::{PushNotification, Result, SlotlineError};

#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: Option<PushMessage>,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default, alias = "message_id")]
    pub message_id: Option<String>,
    #[serde(default, alias = "publish_time")]
    pub publish_time: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl PushEnvelope {
    /// Decode the notification carried in `message.data`.
    ///
    /// Returns `Ok(None)` when the envelope carries no data.
    pub fn notification(&self) -> Result<Option<PushNotification>> {
        let Some(data) = self.message.as_ref().and_then(|m| m.data.as_deref()) else {
            return Ok(None);
        };
        if data.trim().is_empty() {
            return Ok(None);
        }

        let bytes = STANDARD
            .decode(data.trim())
            .or_else(|_| URL_SAFE.decode(data.trim()))
            .map_err(|err| SlotlineError::InvalidInput(format!("push data is not base64: {err}")))?;
        let notification: PushNotification = serde_json::from_slice(&bytes)
            .map_err(|err| SlotlineError::InvalidInput(format!("push data is not a notification: {err}")))?;
        Ok(Some(notification))
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.message_id.as_deref())
    }
}
