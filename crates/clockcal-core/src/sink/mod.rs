//! Where calendar events go.

mod google;

pub use google::{to_gcal_event, GoogleCalendarSink, GOOGLE_CALENDAR_API};

use async_trait::async_trait;

use crate::entry::CalendarEvent;
use crate::error::SinkError;

/// Creates calendar events.
///
/// A sink performs no deduplication: inserting the same event twice yields
/// two events. Avoiding that is the engine's job.
#[async_trait]
pub trait CalendarSink: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Create `event`, returning the id the calendar assigned to it.
    async fn insert_event(&self, event: &CalendarEvent) -> Result<String, SinkError>;
}
