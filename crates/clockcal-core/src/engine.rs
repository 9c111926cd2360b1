//! Reconciliation engine.
//!
//! For each entry the ledger lookup yields one of three states:
//!
//! | Ledger state | Sink call | Ledger effect on success | on sink failure     |
//! |--------------|-----------|--------------------------|---------------------|
//! | absent       | yes       | insert `Synced`          | insert `Pending`    |
//! | `Pending`    | yes       | `Pending -> Synced`      | none                |
//! | `Synced`     | no        | none                     | none                |
//!
//! Entries are handled one at a time, in input order. Nothing that goes wrong
//! with one entry stops the rest of the batch.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::entry::{CalendarEvent, TimeEntry};
use crate::error::{EntryError, LedgerError, SinkError};
use crate::ledger::{Ledger, LedgerRecord, SyncStatus};
use crate::sink::CalendarSink;

/// When a never-seen entry is written to the ledger relative to the sink call.
///
/// Neither order is crash-proof. With `SinkFirst` a crash after the insert
/// but before the ledger write leaves no record, and the next pass creates a
/// second event. `LedgerFirst` leaves a `Pending` record instead, which the
/// next pass retries, so the duplicate window only remains between the sink
/// call and `mark_synced`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOrder {
    /// Call the sink, then insert with the resulting status.
    #[default]
    SinkFirst,
    /// Insert `Pending`, call the sink, then mark `Synced`.
    LedgerFirst,
}

/// Engine tunables, taken from [`Config`] once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub color_id: Option<String>,
    pub sink_timeout: Duration,
    pub source_timeout: Duration,
    pub write_order: WriteOrder,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            color_id: config.google.color_id.clone(),
            sink_timeout: Duration::from_secs(config.sync.sink_timeout_secs),
            source_timeout: Duration::from_secs(config.sync.source_timeout_secs),
            write_order: config.sync.write_order,
        }
    }
}

/// Aggregate result of one [`SyncEngine::reconcile`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Every entry in the batch, whatever happened to it.
    pub processed: usize,
    /// Entries whose sink call succeeded during this pass.
    pub newly_synced: usize,
    /// Entries left `Pending` because the sink call failed.
    pub still_pending: usize,
    /// Entries that were already `Synced`; no sink call was made.
    pub already_synced: usize,
    /// Malformed entries and ledger failures.
    pub errors: usize,
}

impl ReconcileSummary {
    fn record(&mut self, outcome: &EntryOutcome) {
        self.processed += 1;
        match outcome {
            EntryOutcome::AlreadySynced => self.already_synced += 1,
            EntryOutcome::NewlySynced { .. } => self.newly_synced += 1,
            EntryOutcome::StillPending(_) => self.still_pending += 1,
            EntryOutcome::Failed(_) => self.errors += 1,
        }
    }
}

/// Why an entry could not be reconciled this pass.
#[derive(Debug, thiserror::Error)]
pub enum EntryFailure {
    #[error("malformed entry: {0}")]
    Malformed(#[from] EntryError),

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    /// The event was created but the ledger write that records it failed.
    /// The next pass will not know about `event_id`.
    #[error("event {event_id} created but not recorded: {source}")]
    Unrecorded {
        event_id: String,
        #[source]
        source: LedgerError,
    },
}

/// What happened to a single entry.
#[derive(Debug)]
pub enum EntryOutcome {
    AlreadySynced,
    NewlySynced { event_id: String },
    StillPending(SinkError),
    Failed(EntryFailure),
}

/// Drives ledger and calendar sink for batches of time entries.
pub struct SyncEngine<L, S> {
    ledger: L,
    sink: S,
    settings: EngineSettings,
}

impl<L, S> std::fmt::Debug for SyncEngine<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<L: Ledger, S: CalendarSink> SyncEngine<L, S> {
    pub fn new(ledger: L, sink: S, settings: EngineSettings) -> Self {
        Self {
            ledger,
            sink,
            settings,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn into_parts(self) -> (L, S) {
        (self.ledger, self.sink)
    }

    /// Reconcile a batch. Never fails as a whole; see [`ReconcileSummary`].
    pub async fn reconcile(&mut self, entries: &[TimeEntry]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        if entries.is_empty() {
            tracing::info!("no time entries to process");
            return summary;
        }

        for entry in entries {
            let outcome = self.reconcile_entry(entry).await;
            log_outcome(&entry.id, &outcome);
            summary.record(&outcome);
        }

        tracing::info!(
            processed = summary.processed,
            newly_synced = summary.newly_synced,
            still_pending = summary.still_pending,
            already_synced = summary.already_synced,
            errors = summary.errors,
            "reconciliation finished"
        );
        summary
    }

    /// Run the state machine for one entry.
    pub async fn reconcile_entry(&mut self, entry: &TimeEntry) -> EntryOutcome {
        match self.ledger.lookup(&entry.id) {
            Ok(None) => self.reconcile_new(entry).await,
            Ok(Some(record)) if record.is_synced() => EntryOutcome::AlreadySynced,
            Ok(Some(record)) => self.retry_pending(&record).await,
            Err(e) => EntryOutcome::Failed(e.into()),
        }
    }

    async fn reconcile_new(&mut self, entry: &TimeEntry) -> EntryOutcome {
        // Validate before touching the ledger so malformed entries leave no row.
        let event = match entry.to_calendar_event(self.settings.color_id.as_deref()) {
            Ok(event) => event,
            Err(e) => return EntryOutcome::Failed(e.into()),
        };

        match self.settings.write_order {
            WriteOrder::SinkFirst => {
                let pushed = self.push(&event).await;
                let status = if pushed.is_ok() {
                    SyncStatus::Synced
                } else {
                    SyncStatus::Pending
                };

                if let Err(source) = self.ledger.insert(entry, status) {
                    return EntryOutcome::Failed(match pushed {
                        Ok(event_id) => EntryFailure::Unrecorded { event_id, source },
                        Err(_) => EntryFailure::Ledger(source),
                    });
                }

                match pushed {
                    Ok(event_id) => EntryOutcome::NewlySynced { event_id },
                    Err(e) => EntryOutcome::StillPending(e),
                }
            }
            WriteOrder::LedgerFirst => {
                if let Err(e) = self.ledger.insert(entry, SyncStatus::Pending) {
                    return EntryOutcome::Failed(e.into());
                }
                self.push_and_mark(&entry.id, &event).await
            }
        }
    }

    async fn retry_pending(&mut self, record: &LedgerRecord) -> EntryOutcome {
        // The ledger copy is authoritative: fields are frozen at first sight.
        let frozen = record.to_entry();
        let event = match frozen.to_calendar_event(self.settings.color_id.as_deref()) {
            Ok(event) => event,
            Err(e) => return EntryOutcome::Failed(e.into()),
        };
        self.push_and_mark(&record.id, &event).await
    }

    async fn push_and_mark(&mut self, id: &str, event: &CalendarEvent) -> EntryOutcome {
        match self.push(event).await {
            Ok(event_id) => match self.ledger.mark_synced(id) {
                Ok(()) => EntryOutcome::NewlySynced { event_id },
                Err(source) => EntryOutcome::Failed(EntryFailure::Unrecorded { event_id, source }),
            },
            Err(e) => EntryOutcome::StillPending(e),
        }
    }

    /// One sink call, bounded by the configured timeout.
    async fn push(&self, event: &CalendarEvent) -> Result<String, SinkError> {
        let timeout = self.settings.sink_timeout;
        match tokio::time::timeout(timeout, self.sink.insert_event(event)).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout {
                secs: timeout.as_secs(),
            }),
        }
    }
}

fn log_outcome(entry_id: &str, outcome: &EntryOutcome) {
    match outcome {
        EntryOutcome::AlreadySynced => {
            tracing::trace!(entry_id, "already synced");
        }
        EntryOutcome::NewlySynced { event_id } => {
            tracing::info!(entry_id, event_id = %event_id, "added entry to calendar");
        }
        EntryOutcome::StillPending(e) => {
            tracing::warn!(entry_id, error = %e, "calendar insert failed, will retry next pass");
        }
        EntryOutcome::Failed(e) => {
            tracing::error!(entry_id, error = %e, "error processing entry");
        }
    }
}
