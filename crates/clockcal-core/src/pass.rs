//! One sync pass: fetch the lookback window, then reconcile what came back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{ReconcileSummary, SyncEngine};
use crate::error::SourceError;
use crate::ledger::Ledger;
use crate::sink::CalendarSink;
use crate::source::{EntrySource, LookbackWindow};

/// What a pass did, suitable for printing or serializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub window: LookbackWindow,
    /// Entries returned by the source.
    pub fetched: usize,
    /// Set when the fetch failed and the pass reconciled nothing.
    pub fetch_error: Option<String>,
    pub summary: ReconcileSummary,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.fetch_error.is_none() && self.summary.errors == 0
    }
}

impl<L: Ledger, S: CalendarSink> SyncEngine<L, S> {
    /// Fetch entries for the window ending at `now` and reconcile them.
    ///
    /// A failed or timed-out fetch is logged and treated as an empty batch,
    /// so the pass still completes and the ledger is untouched.
    pub async fn run_pass<Src>(
        &mut self,
        source: &Src,
        now: DateTime<Utc>,
        lookback_hours: u32,
    ) -> PassReport
    where
        Src: EntrySource + ?Sized,
    {
        let window = LookbackWindow::ending_at(now, lookback_hours);
        tracing::info!(
            source = source.name(),
            start = %window.start,
            end = %window.end,
            "fetching time entries"
        );

        let timeout = self.settings().source_timeout;
        let fetched = match tokio::time::timeout(timeout, source.fetch_entries(&window)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                secs: timeout.as_secs(),
            }),
        };

        let (entries, fetch_error) = match fetched {
            Ok(entries) => (entries, None),
            Err(e) => {
                tracing::error!(source = source.name(), error = %e, "error fetching time entries");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let summary = self.reconcile(&entries).await;
        PassReport {
            window,
            fetched: entries.len(),
            fetch_error,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::entry::{CalendarEvent, TimeEntry};
    use crate::error::SinkError;
    use crate::ledger::MemoryLedger;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct FixedSource {
        result: Mutex<Option<Result<Vec<TimeEntry>, SourceError>>>,
        seen: Mutex<Option<LookbackWindow>>,
    }

    impl FixedSource {
        fn new(result: Result<Vec<TimeEntry>, SourceError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl EntrySource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_entries(
            &self,
            window: &LookbackWindow,
        ) -> Result<Vec<TimeEntry>, SourceError> {
            *self.seen.lock().unwrap() = Some(*window);
            self.result.lock().unwrap().take().unwrap_or(Ok(Vec::new()))
        }
    }

    struct HangingSource;

    #[async_trait]
    impl EntrySource for HangingSource {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn fetch_entries(&self, _: &LookbackWindow) -> Result<Vec<TimeEntry>, SourceError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl CalendarSink for AcceptAll {
        fn name(&self) -> &str {
            "accept-all"
        }

        async fn insert_event(&self, _: &CalendarEvent) -> Result<String, SinkError> {
            Ok("evt".into())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    fn finished(id: &str) -> TimeEntry {
        let start = now() - Duration::hours(2);
        TimeEntry {
            id: id.into(),
            start_time: start,
            end_time: Some(start + Duration::minutes(30)),
            duration: None,
            description: Some("Review".into()),
            project_id: None,
        }
    }

    #[tokio::test]
    async fn pass_queries_the_lookback_window() {
        let source = FixedSource::new(Ok(vec![finished("a"), finished("b")]));
        let mut engine = SyncEngine::new(MemoryLedger::new(), AcceptAll, EngineSettings::default());

        let report = engine.run_pass(&source, now(), 6).await;

        let window = source.seen.lock().unwrap().unwrap();
        assert_eq!(window.end, now());
        assert_eq!(window.start, now() - Duration::hours(6));
        assert_eq!(report.fetched, 2);
        assert_eq!(report.summary.newly_synced, 2);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn fetch_failure_is_an_empty_pass() {
        let source = FixedSource::new(Err(SourceError::Api {
            status: 401,
            message: "bad key".into(),
        }));
        let mut engine = SyncEngine::new(MemoryLedger::new(), AcceptAll, EngineSettings::default());

        let report = engine.run_pass(&source, now(), 6).await;

        assert_eq!(report.fetched, 0);
        assert!(report.fetch_error.as_deref().unwrap().contains("401"));
        assert_eq!(report.summary, ReconcileSummary::default());
        assert!(engine.ledger().is_empty());
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn fetch_timeout_is_reported() {
        let settings = EngineSettings {
            source_timeout: std::time::Duration::from_millis(20),
            ..EngineSettings::default()
        };
        let mut engine = SyncEngine::new(MemoryLedger::new(), AcceptAll, settings);

        let report = engine.run_pass(&HangingSource, now(), 6).await;

        assert!(report.fetch_error.unwrap().contains("timed out"));
    }
}
