//! # clockcal core
//!
//! Mirrors finished Clockify time entries into a Google Calendar, creating
//! each event exactly once. A SQLite ledger remembers every entry seen and
//! whether its event exists, so repeated passes over overlapping windows
//! never duplicate events and failed inserts are retried.
//!
//! ## Architecture
//!
//! - **Source**: [`EntrySource`] fetches time entries for a lookback window
//!   ([`ClockifySource`] talks to the Clockify REST API)
//! - **Ledger**: [`Ledger`] records per-entry sync state
//!   ([`SqliteLedger`] on disk, [`MemoryLedger`] for tests)
//! - **Sink**: [`CalendarSink`] creates calendar events
//!   ([`GoogleCalendarSink`] talks to Google Calendar v3)
//! - **Engine**: [`SyncEngine`] reconciles a batch against the ledger and
//!   decides which entries the sink must see

pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod oauth;
pub mod pass;
pub mod sink;
pub mod source;


pub use config::Config;
pub use engine::{
    EngineSettings, EntryFailure, EntryOutcome, ReconcileSummary, SyncEngine, WriteOrder,
};
pub use entry::{CalendarEvent, TimeEntry};
pub use error::{
    ConfigError, CoreError, EntryError, LedgerError, OAuthError, Result, SinkError, SourceError,
};
pub use ledger::{Ledger, LedgerRecord, MemoryLedger, SqliteLedger, StatusCounts, SyncStatus};
pub use oauth::{KeyringTokens, OAuthConfig, OAuthTokens, StaticToken, TokenProvider};
pub use pass::PassReport;
pub use sink::{CalendarSink, GoogleCalendarSink};
pub use source::{ClockifySource, ClockifyUser, EntrySource, LookbackWindow};
