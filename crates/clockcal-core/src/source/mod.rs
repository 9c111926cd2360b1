//! Where time entries come from.

mod clockify;

pub use clockify::{ClockifySource, ClockifyUser};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::TimeEntry;
use crate::error::SourceError;

/// Time range queried from the source on each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LookbackWindow {
    /// `[now - hours, now]`.
    pub fn ending_at(now: DateTime<Utc>, hours: u32) -> Self {
        Self {
            start: now - Duration::hours(i64::from(hours)),
            end: now,
        }
    }
}

/// Supplies finished time entries overlapping a window.
///
/// Implementations should exclude entries that are still running; the engine
/// treats any that slip through as malformed.
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn fetch_entries(&self, window: &LookbackWindow) -> Result<Vec<TimeEntry>, SourceError>;
}
