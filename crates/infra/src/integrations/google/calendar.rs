//! Google Calendar v3 free/busy adapter for [`CalendarProvider`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use slotline_core::CalendarProvider;
use slotline_domain::{BusyInterval, Provider, Result, SlotlineError};
use tracing::{instrument, warn};

use super::provider_error;
use crate::errors::InfraError;
use crate::http::HttpClient;

const PRIMARY_CALENDAR: &str = "primary";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: String,
    time_max: String,
    items: [CalendarItem<'a>; 1],
}

#[derive(Debug, Serialize)]
struct CalendarItem<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<RawBusy>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct RawBusy {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    #[serde(default)]
    reason: String,
}

pub struct GoogleCalendarClient {
    http: HttpClient,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    #[instrument(skip(self, access_token))]
    async fn busy_intervals(
        &self,
        access_token: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>> {
        let body = FreeBusyRequest {
            time_min: from.to_rfc3339_opts(SecondsFormat::Secs, true),
            time_max: to.to_rfc3339_opts(SecondsFormat::Secs, true),
            items: [CalendarItem { id: PRIMARY_CALENDAR }],
        };

        let request = self
            .http
            .request(Method::POST, format!("{}/freeBusy", self.base_url))
            .bearer_auth(access_token)
            .json(&body);
        let response = self.http.send(request).await?;
        if !response.status().is_success() {
            return Err(provider_error(Provider::Calendar, response).await);
        }

        let mut parsed: FreeBusyResponse =
            response.json().await.map_err(|err| SlotlineError::from(InfraError::from(err)))?;
        let Some(primary) = parsed.calendars.remove(PRIMARY_CALENDAR) else {
            return Ok(Vec::new());
        };

        if let Some(first) = primary.errors.first() {
            return Err(SlotlineError::Network(format!("free/busy lookup failed: {}", first.reason)));
        }

        Ok(primary.busy.into_iter().filter_map(parse_busy).collect())
    }
}

/// Intervals with a missing or unparseable bound, or a non-positive length,
/// are dropped.
fn parse_busy(raw: RawBusy) -> Option<BusyInterval> {
    let parse = |value: Option<&str>| {
        value
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };

    let interval = match (parse(raw.start.as_deref()), parse(raw.end.as_deref())) {
        (Some(start), Some(end)) => BusyInterval::new(start, end),
        _ => None,
    };
    if interval.is_none() {
        warn!(start = ?raw.start, end = ?raw.end, "dropping malformed busy interval");
    }
    interval
}
