//! Ledger schema migrations.
//!
//! Migrations are versioned and applied when the ledger is initialized.
//! The `schema_version` table tracks the current migration version.
//!
//! Version 1 is the plain `time_entries` table, so ledgers written by
//! earlier tooling are adopted in place.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the ledger to [`SCHEMA_VERSION`].
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        apply(conn, 1, migrate_v1)?;
    }
    if current_version < 2 {
        apply(conn, 2, migrate_v2)?;
    }

    Ok(())
}

/// Run one migration step and record its version atomically.
fn apply(
    conn: &Connection,
    version: i32,
    step: fn(&Connection) -> SqliteResult<()>,
) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    step(&tx)?;
    set_schema_version(&tx, version)?;
    tx.commit()?;
    tracing::debug!(version, "applied ledger migration");
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: the time entry table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS time_entries (
            id                TEXT PRIMARY KEY,
            start_time        TEXT NOT NULL,
            end_time          TEXT,
            duration          TEXT,
            description       TEXT,
            project_id        TEXT,
            added_to_calendar INTEGER DEFAULT 0
        );",
    )
}

/// v2: bookkeeping timestamps and a status index.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "ALTER TABLE time_entries ADD COLUMN first_seen_at TEXT;
         ALTER TABLE time_entries ADD COLUMN synced_at TEXT;
         UPDATE time_entries SET first_seen_at = start_time WHERE first_seen_at IS NULL;
         CREATE INDEX IF NOT EXISTS idx_time_entries_added_to_calendar
             ON time_entries(added_to_calendar);",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn legacy_table_is_adopted() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE time_entries (
                id TEXT PRIMARY KEY,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration TEXT,
                description TEXT,
                project_id TEXT,
                added_to_calendar INTEGER DEFAULT 0
            );
            INSERT INTO time_entries (id, start_time, added_to_calendar)
                VALUES ('old', '2024-01-01T10:00:00Z', 1);",
        )
        .unwrap();

        migrate(&conn).unwrap();

        let first_seen: String = conn
            .query_row(
                "SELECT first_seen_at FROM time_entries WHERE id = 'old'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(first_seen, "2024-01-01T10:00:00Z");
    }

    fn columns(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("PRAGMA table_info(time_entries)").unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn failed_step_is_rolled_back() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        apply(&conn, 1, migrate_v1).unwrap();

        let result = apply(&conn, 2, |conn| {
            conn.execute_batch("ALTER TABLE time_entries ADD COLUMN first_seen_at TEXT;")?;
            Err(rusqlite::Error::ExecuteReturnedResults)
        });

        assert!(result.is_err());
        assert_eq!(get_schema_version(&conn), 1);
        assert!(!columns(&conn).iter().any(|c| c == "first_seen_at"));

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        assert!(columns(&conn).iter().any(|c| c == "synced_at"));
    }
}
