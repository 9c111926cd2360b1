pub mod auth;
pub mod clockify;
pub mod config;
pub mod init;
pub mod status;
pub mod sync;

use clockcal_core::{Config, Ledger, SqliteLedger};

/// Open the configured ledger and make sure its schema is current.
pub fn open_ledger(config: &Config) -> Result<SqliteLedger, Box<dyn std::error::Error>> {
    let path = config.database_path()?;
    let mut ledger = SqliteLedger::open(&path)?;
    ledger.initialize()?;
    Ok(ledger)
}
