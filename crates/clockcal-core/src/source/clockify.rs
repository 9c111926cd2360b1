//! Clockify REST API entry source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EntrySource, LookbackWindow};
use crate::config::ClockifyConfig;
use crate::entry::TimeEntry;
use crate::error::{ConfigError, SourceError};

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Reads a user's finished time entries from one Clockify workspace.
pub struct ClockifySource {
    http: Client,
    base_url: String,
    api_key: String,
    workspace_id: String,
    user_id: String,
    page_size: u32,
    max_pages: u32,
}

impl std::fmt::Debug for ClockifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockifySource")
            .field("base_url", &self.base_url)
            .field("workspace_id", &self.workspace_id)
            .field("user_id", &self.user_id)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

/// Time entry as returned by `GET .../time-entries`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTimeEntry {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    time_interval: WireInterval,
}

#[derive(Debug, Deserialize)]
struct WireInterval {
    start: DateTime<Utc>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    duration: Option<String>,
}

/// The account an API key belongs to, as returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockifyUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub active_workspace: Option<String>,
    #[serde(default)]
    pub default_workspace: Option<String>,
}

impl From<WireTimeEntry> for TimeEntry {
    fn from(wire: WireTimeEntry) -> Self {
        TimeEntry {
            id: wire.id,
            start_time: wire.time_interval.start,
            end_time: wire.time_interval.end,
            duration: wire.time_interval.duration,
            description: wire.description,
            project_id: wire.project_id,
        }
    }
}

impl ClockifySource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        workspace_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            max_pages: crate::config::DEFAULT_MAX_PAGES,
        }
    }

    /// Build from configuration.
    ///
    /// # Errors
    /// [`ConfigError::MissingKeys`] when the API key, workspace or user is unset.
    pub fn from_config(config: &ClockifyConfig) -> Result<Self, ConfigError> {
        let missing = config.missing_keys();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }
        let source = Self::new(
            config.base_url.clone(),
            config.api_key.clone().unwrap_or_default(),
            config.workspace_id.clone().unwrap_or_default(),
            config.user_id.clone().unwrap_or_default(),
        );
        Ok(source
            .with_page_size(config.page_size)
            .with_max_pages(config.max_pages))
    }

    /// Look up the user that owns `api_key`.
    ///
    /// Used to discover the `clockify.user_id` a source needs.
    pub async fn current_user(
        base_url: &str,
        api_key: &str,
    ) -> Result<ClockifyUser, SourceError> {
        let url = format!("{}/user", base_url.trim_end_matches('/'));
        let resp = Client::new()
            .get(url)
            .header("X-Api-Key", api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        serde_json::from_value(body).map_err(|e| SourceError::Decode(format!("user: {e}")))
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn entries_url(&self) -> String {
        format!(
            "{}/workspaces/{}/user/{}/time-entries",
            self.base_url, self.workspace_id, self.user_id
        )
    }

    async fn fetch_page(
        &self,
        window: &LookbackWindow,
        page: u32,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let start = window.start.format(QUERY_TIME_FORMAT).to_string();
        let end = window.end.format(QUERY_TIME_FORMAT).to_string();
        let page_size = self.page_size.to_string();
        let page = page.to_string();

        let resp = self
            .http
            .get(self.entries_url())
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("page-size", page_size.as_str()),
                ("page", page.as_str()),
                ("in-progress", "false"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        match body {
            serde_json::Value::Array(items) => Ok(items),
            other => Err(SourceError::Decode(format!(
                "expected a JSON array of time entries, got {}",
                json_kind(&other)
            ))),
        }
    }
}

#[async_trait]
impl EntrySource for ClockifySource {
    fn name(&self) -> &str {
        "clockify"
    }

    async fn fetch_entries(&self, window: &LookbackWindow) -> Result<Vec<TimeEntry>, SourceError> {
        let mut entries = Vec::new();

        for page in 1..=self.max_pages {
            let items = self.fetch_page(window, page).await?;
            let short_page = items.len() < self.page_size as usize;

            for item in items {
                match serde_json::from_value::<WireTimeEntry>(item) {
                    Ok(wire) => entries.push(TimeEntry::from(wire)),
                    Err(e) => tracing::warn!(page, "dropping undecodable time entry: {e}"),
                }
            }

            if short_page {
                break;
            }
            if page == self.max_pages {
                tracing::warn!(
                    max_pages = self.max_pages,
                    "stopped paging before the end of the window; raise clockify.max_pages"
                );
            }
        }

        tracing::debug!(count = entries.len(), "fetched time entries");
        Ok(entries)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wire_entry_maps_to_time_entry() {
        let wire: WireTimeEntry = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "description": "Standup",
            "projectId": "p1",
            "timeInterval": {
                "start": "2025-03-04T09:00:00Z",
                "end": "2025-03-04T09:15:00Z",
                "duration": "PT15M"
            }
        }))
        .unwrap();

        let entry = TimeEntry::from(wire);
        assert_eq!(entry.id, "abc");
        assert_eq!(
            entry.start_time,
            Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap()
        );
        assert_eq!(
            entry.end_time,
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 9, 15, 0).unwrap())
        );
        assert_eq!(entry.duration.as_deref(), Some("PT15M"));
        assert_eq!(entry.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn running_entry_has_null_end() {
        let wire: WireTimeEntry = serde_json::from_value(serde_json::json!({
            "id": "run",
            "description": null,
            "projectId": null,
            "timeInterval": {"start": "2025-03-04T09:00:00Z", "end": null, "duration": null}
        }))
        .unwrap();
        let entry = TimeEntry::from(wire);
        assert!(entry.end_time.is_none());
        assert!(entry.description.is_none());
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = ClockifyConfig::default();
        let err = ClockifySource::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKeys(keys) if keys.len() == 3));
    }
}
