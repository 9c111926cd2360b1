//! Core error types for clockcal-core.
//!
//! Every collaborator of the reconciliation engine reports failures through
//! its own enum so the engine can branch on the kind of failure instead of
//! catching everything at once.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for clockcal-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Ledger-related errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Entry source errors
    #[error("Entry source error: {0}")]
    Source(#[from] SourceError),

    /// Calendar sink errors
    #[error("Calendar sink error: {0}")]
    Sink(#[from] SinkError),

    /// OAuth / credential errors
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ledger (SQLite) errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open the ledger database
    #[error("Failed to open ledger at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to create the directory holding the ledger
    #[error("Failed to create ledger directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record with this id already exists
    #[error("Ledger already has a record for entry '{0}'")]
    DuplicateKey(String),

    /// No record with this id exists
    #[error("Ledger has no record for entry '{0}'")]
    NotFound(String),

    /// A stored row could not be decoded
    #[error("Corrupt ledger row for entry '{id}': {message}")]
    Corrupt { id: String, message: String },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Ledger migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Ledger database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Required settings are missing
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),

    /// No usable data directory
    #[error("Could not determine the clockcal data directory")]
    NoDataDir,
}

/// Failures fetching entries from the time-tracking service.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Time tracking API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected shape
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// The fetch did not finish in time
    #[error("Fetching entries timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Failures creating a calendar event.
#[derive(Error, Debug)]
pub enum SinkError {
    /// No usable credentials, or the service rejected them
    #[error("Not authenticated with the calendar service: {0}")]
    Unauthenticated(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Calendar API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The insert did not finish in time
    #[error("Calendar insert timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// An entry that cannot be turned into a calendar event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// The entry is still running or the source left out its end time
    #[error("Entry '{id}' has no end time")]
    MissingEndTime { id: String },

    /// End time precedes start time
    #[error("Entry '{id}' ends ({end}) before it starts ({start})")]
    InvalidTimeRange {
        id: String,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
}

/// OAuth-specific errors.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Access token expired
    #[error("Access token expired and no refresh token available")]
    TokenExpired,

    /// Not authenticated
    #[error("Not authenticated with {service}")]
    NotAuthenticated { service: String },

    /// Credentials not configured
    #[error("OAuth credentials not configured for {service}")]
    CredentialsNotConfigured { service: String },

    /// OS keyring failure
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Stored token blob could not be (de)serialized
    #[error("Token serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    LedgerError::Locked
                } else {
                    LedgerError::QueryFailed(err.to_string())
                }
            }
            _ => LedgerError::QueryFailed(err.to_string()),
        }
    }
}

impl From<OAuthError> for SinkError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Network(e) => SinkError::Network(e),
            other => SinkError::Unauthenticated(other.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_lists_every_key() {
        let err = ConfigError::MissingKeys(vec!["clockify.api_key", "google.calendar_id"]);
        assert_eq!(
            err.to_string(),
            "Missing required configuration: clockify.api_key, google.calendar_id"
        );
    }

    #[test]
    fn oauth_errors_become_unauthenticated_sink_errors() {
        let err: SinkError = OAuthError::NotAuthenticated {
            service: "google".into(),
        }
        .into();
        assert!(matches!(err, SinkError::Unauthenticated(_)));
    }

    #[test]
    fn constraint_failures_are_query_failures() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(matches!(LedgerError::from(err), LedgerError::QueryFailed(_)));
    }
}
