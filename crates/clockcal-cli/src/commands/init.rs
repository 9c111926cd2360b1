use clockcal_core::{Config, Ledger};

use super::open_ledger;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let ledger = open_ledger(&config)?;
    let counts = ledger.counts()?;
    if let Some(path) = ledger.path() {
        println!("ledger ready at {}", path.display());
    }
    println!("{} records ({} pending)", counts.total(), counts.pending);
    Ok(())
}
