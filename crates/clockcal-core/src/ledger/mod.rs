//! The sync ledger: one record per time entry ever seen, with its mirror status.
//!
//! Records are append-mostly. Once written, only the status may change, and
//! only from [`SyncStatus::Pending`] to [`SyncStatus::Synced`].

mod memory;
pub mod migrations;
mod sqlite;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::TimeEntry;
use crate::error::LedgerError;

/// Whether the calendar event for an entry is known to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Seen, but no sink call has succeeded yet.
    Pending,
    /// The sink accepted the event.
    Synced,
}

impl SyncStatus {
    /// Column value stored in `added_to_calendar`.
    pub fn as_flag(self) -> i64 {
        match self {
            SyncStatus::Pending => 0,
            SyncStatus::Synced => 1,
        }
    }

    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(SyncStatus::Pending),
            1 => Some(SyncStatus::Synced),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger row: the entry as first seen plus its sync status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub status: SyncStatus,
    pub first_seen_at: DateTime<Utc>,
    /// Set on the first transition to `Synced`.
    pub synced_at: Option<DateTime<Utc>>,
}

impl LedgerRecord {
    /// Freeze `entry` into a new record.
    pub fn from_entry(entry: &TimeEntry, status: SyncStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: entry.id.clone(),
            start_time: entry.start_time,
            end_time: entry.end_time,
            duration: entry.duration.clone(),
            description: entry.description.clone(),
            project_id: entry.project_id.clone(),
            status,
            first_seen_at: now,
            synced_at: (status == SyncStatus::Synced).then_some(now),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.status == SyncStatus::Synced
    }

    /// The entry as it was first seen.
    pub fn to_entry(&self) -> TimeEntry {
        TimeEntry {
            id: self.id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.duration.clone(),
            description: self.description.clone(),
            project_id: self.project_id.clone(),
        }
    }
}

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub synced: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.synced
    }
}

/// Durable store of sync state, keyed by entry id.
///
/// There is intentionally no delete and no content update.
pub trait Ledger {
    /// Create the store and schema if needed. Safe to call on every start.
    fn initialize(&mut self) -> Result<(), LedgerError>;

    /// Point lookup. `None` means the id was never seen.
    fn lookup(&self, id: &str) -> Result<Option<LedgerRecord>, LedgerError>;

    /// Create a record for a never-seen entry.
    ///
    /// # Errors
    /// [`LedgerError::DuplicateKey`] if a record with this id exists.
    fn insert(&mut self, entry: &TimeEntry, status: SyncStatus) -> Result<(), LedgerError>;

    /// Move a record to `Synced`. Already-synced records are left as they are.
    ///
    /// # Errors
    /// [`LedgerError::NotFound`] if the id is unknown.
    fn mark_synced(&mut self, id: &str) -> Result<(), LedgerError>;

    /// Records per status.
    fn counts(&self) -> Result<StatusCounts, LedgerError>;

    /// Records ordered by start time, optionally restricted to one status.
    fn list(&self, status: Option<SyncStatus>) -> Result<Vec<LedgerRecord>, LedgerError>;
}
