//! Google Calendar API v3 sink.

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::CalendarSink;
use crate::entry::CalendarEvent;
use crate::error::SinkError;
use crate::oauth::TokenProvider;

pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Inserts events into one Google calendar.
pub struct GoogleCalendarSink {
    http: Client,
    base_url: String,
    calendar_id: String,
    tokens: Box<dyn TokenProvider>,
}

impl std::fmt::Debug for GoogleCalendarSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarSink")
            .field("base_url", &self.base_url)
            .field("calendar_id", &self.calendar_id)
            .finish_non_exhaustive()
    }
}

impl GoogleCalendarSink {
    pub fn new(
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        tokens: Box<dyn TokenProvider>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
            tokens,
        }
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn events_url(&self) -> Result<String, SinkError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| SinkError::Api {
                status: 0,
                message: format!("invalid calendar base url '{}': {e}", self.base_url),
            })?;
        url.path_segments_mut()
            .map_err(|()| SinkError::Api {
                status: 0,
                message: format!("calendar base url '{}' cannot be a base", self.base_url),
            })?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url.into())
    }
}

#[async_trait]
impl CalendarSink for GoogleCalendarSink {
    fn name(&self) -> &str {
        "google-calendar"
    }

    async fn insert_event(&self, event: &CalendarEvent) -> Result<String, SinkError> {
        let token = self.tokens.access_token().await?;
        let url = self.events_url()?;

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&to_gcal_event(event))
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = resp.text().await.unwrap_or_default();
            return Err(SinkError::Unauthenticated(format!("{status}: {message}")));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        let event_id = body["id"].as_str().ok_or_else(|| SinkError::Api {
            status: status.as_u16(),
            message: "missing event id in response".to_string(),
        })?;
        Ok(event_id.to_string())
    }
}

/// Google Calendar request body for `event`.
pub fn to_gcal_event(event: &CalendarEvent) -> serde_json::Value {
    let mut body = json!({
        "summary": event.title,
        "description": event.body,
        "start": {
            "dateTime": event.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": "UTC",
        },
        "end": {
            "dateTime": event.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": "UTC",
        },
    });
    if let Some(color) = &event.color_id {
        body["colorId"] = json!(color);
    }
    body
}
