//! SQLite-backed ledger.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{migrations, Ledger, LedgerRecord, StatusCounts, SyncStatus};
use crate::entry::TimeEntry;
use crate::error::LedgerError;

const SELECT_COLUMNS: &str = "id, start_time, end_time, duration, description, project_id,
     added_to_calendar, first_seen_at, synced_at";

/// Ledger stored in a single SQLite file.
pub struct SqliteLedger {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteLedger {
    /// Open (or create) the ledger file at `path`.
    ///
    /// The schema is not touched until [`Ledger::initialize`] is called.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LedgerError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(&path).map_err(|source| LedgerError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Open an in-memory ledger.
    pub fn open_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Location of the ledger file, `None` for in-memory ledgers.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn exists(&self, id: &str) -> Result<bool, LedgerError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM time_entries WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl Ledger for SqliteLedger {
    fn initialize(&mut self) -> Result<(), LedgerError> {
        migrations::migrate(&self.conn)
            .map_err(|e| LedgerError::MigrationFailed(e.to_string()))?;
        tracing::debug!(path = ?self.path, "ledger initialized");
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Option<LedgerRecord>, LedgerError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM time_entries WHERE id = ?1");
        let raw = self
            .conn
            .query_row(&sql, params![id], RawRow::read)
            .optional()?;
        raw.map(RawRow::into_record).transpose()
    }

    fn insert(&mut self, entry: &TimeEntry, status: SyncStatus) -> Result<(), LedgerError> {
        let record = LedgerRecord::from_entry(entry, status, Utc::now());
        let result = self.conn.execute(
            "INSERT INTO time_entries
             (id, start_time, end_time, duration, description, project_id,
              added_to_calendar, first_seen_at, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                format_ts(record.start_time),
                record.end_time.map(format_ts),
                record.duration,
                record.description,
                record.project_id,
                record.status.as_flag(),
                format_ts(record.first_seen_at),
                record.synced_at.map(format_ts),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(LedgerError::DuplicateKey(entry.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn mark_synced(&mut self, id: &str) -> Result<(), LedgerError> {
        let changed = self.conn.execute(
            "UPDATE time_entries
             SET added_to_calendar = 1, synced_at = ?2
             WHERE id = ?1 AND added_to_calendar = 0",
            params![id, format_ts(Utc::now())],
        )?;

        if changed == 0 && !self.exists(id)? {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn counts(&self) -> Result<StatusCounts, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT added_to_calendar, COUNT(*) FROM time_entries GROUP BY added_to_calendar",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, u64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (flag, count) = row?;
            match flag.and_then(SyncStatus::from_flag) {
                Some(SyncStatus::Synced) => counts.synced += count,
                // NULL and unknown flags behave as not yet added
                _ => counts.pending += count,
            }
        }
        Ok(counts)
    }

    fn list(&self, status: Option<SyncStatus>) -> Result<Vec<LedgerRecord>, LedgerError> {
        let raws = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM time_entries
                     WHERE COALESCE(added_to_calendar, 0) = ?1
                     ORDER BY start_time, id"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status.as_flag()], RawRow::read)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("SELECT {SELECT_COLUMNS} FROM time_entries ORDER BY start_time, id");
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([], RawRow::read)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        raws.into_iter().map(RawRow::into_record).collect()
    }
}

/// Column values as stored, before timestamp parsing.
struct RawRow {
    id: String,
    start_time: String,
    end_time: Option<String>,
    duration: Option<String>,
    description: Option<String>,
    project_id: Option<String>,
    added_to_calendar: Option<i64>,
    first_seen_at: Option<String>,
    synced_at: Option<String>,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            duration: row.get(3)?,
            description: row.get(4)?,
            project_id: row.get(5)?,
            added_to_calendar: row.get(6)?,
            first_seen_at: row.get(7)?,
            synced_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<LedgerRecord, LedgerError> {
        let id = self.id;
        let parse = |value: &str| {
            parse_ts(value).map_err(|message| LedgerError::Corrupt {
                id: id.clone(),
                message,
            })
        };

        let start_time = parse(&self.start_time)?;
        let end_time = self.end_time.as_deref().map(parse).transpose()?;
        let first_seen_at = match self.first_seen_at.as_deref() {
            Some(value) => parse(value)?,
            None => start_time,
        };
        let synced_at = self.synced_at.as_deref().map(parse).transpose()?;
        let status = SyncStatus::from_flag(self.added_to_calendar.unwrap_or(0)).ok_or_else(|| {
            LedgerError::Corrupt {
                id: id.clone(),
                message: format!("unknown status flag {:?}", self.added_to_calendar),
            }
        })?;

        Ok(LedgerRecord {
            id,
            start_time,
            end_time,
            duration: self.duration,
            description: self.description,
            project_id: self.project_id,
            status,
            first_seen_at,
            synced_at,
        })
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{value}': {e}"))
}
