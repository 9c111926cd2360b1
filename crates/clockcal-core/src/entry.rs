//! Time entries and the calendar events they become.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// Title used when an entry carries no description.
pub const DEFAULT_TITLE: &str = "Time Entry";

/// Google Calendar color id for green.
pub const DEFAULT_COLOR_ID: &str = "2";

/// One tracked interval reported by the time-tracking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Opaque, stable identity assigned by the source.
    pub id: String,
    pub start_time: DateTime<Utc>,
    /// Absent while the timer is still running.
    pub end_time: Option<DateTime<Utc>>,
    /// Display duration as reported by the source (e.g. `PT1H30M`).
    pub duration: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<String>,
}

impl TimeEntry {
    /// Both bounds of the entry, or why they are unusable.
    pub fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), EntryError> {
        let end = self.end_time.ok_or_else(|| EntryError::MissingEndTime {
            id: self.id.clone(),
        })?;
        if end < self.start_time {
            return Err(EntryError::InvalidTimeRange {
                id: self.id.clone(),
                start: self.start_time,
                end,
            });
        }
        Ok((self.start_time, end))
    }

    /// Build the calendar event mirroring this entry.
    pub fn to_calendar_event(&self, color_id: Option<&str>) -> Result<CalendarEvent, EntryError> {
        let (start, end) = self.bounds()?;

        let title = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();

        let body = format!(
            "Project: {}",
            self.project_id.as_deref().unwrap_or("No project")
        );

        Ok(CalendarEvent {
            title,
            body,
            start,
            end,
            color_id: color_id.map(str::to_string),
        })
    }
}

/// Normalized description of a calendar event handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub body: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Visual category tag understood by the calendar service.
    pub color_id: Option<String>,
}
