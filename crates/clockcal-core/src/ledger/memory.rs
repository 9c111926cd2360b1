//! In-memory ledger for tests and dry runs.

use std::collections::HashMap;

use chrono::Utc;

use super::{Ledger, LedgerRecord, StatusCounts, SyncStatus};
use crate::entry::TimeEntry;
use crate::error::LedgerError;

/// Ledger held in a `HashMap`. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    records: HashMap<String, LedgerRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn initialize(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Option<LedgerRecord>, LedgerError> {
        Ok(self.records.get(id).cloned())
    }

    fn insert(&mut self, entry: &TimeEntry, status: SyncStatus) -> Result<(), LedgerError> {
        if self.records.contains_key(&entry.id) {
            return Err(LedgerError::DuplicateKey(entry.id.clone()));
        }
        self.records.insert(
            entry.id.clone(),
            LedgerRecord::from_entry(entry, status, Utc::now()),
        );
        Ok(())
    }

    fn mark_synced(&mut self, id: &str) -> Result<(), LedgerError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        if record.status == SyncStatus::Pending {
            record.status = SyncStatus::Synced;
            record.synced_at = Some(Utc::now());
        }
        Ok(())
    }

    fn counts(&self) -> Result<StatusCounts, LedgerError> {
        let mut counts = StatusCounts::default();
        for record in self.records.values() {
            match record.status {
                SyncStatus::Pending => counts.pending += 1,
                SyncStatus::Synced => counts.synced += 1,
            }
        }
        Ok(counts)
    }

    fn list(&self, status: Option<SyncStatus>) -> Result<Vec<LedgerRecord>, LedgerError> {
        let mut records: Vec<_> = self
            .records
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}
