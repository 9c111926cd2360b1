use clap::Args;
use clockcal_core::{Config, Ledger, SyncStatus};

use super::open_ledger;

#[derive(Args)]
pub struct StatusArgs {
    /// List records still waiting for a calendar event
    #[arg(long)]
    pending: bool,
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let ledger = open_ledger(&config)?;
    let counts = ledger.counts()?;
    let pending = if args.pending {
        ledger.list(Some(SyncStatus::Pending))?
    } else {
        Vec::new()
    };

    if args.json {
        let mut out = serde_json::json!({
            "pending": counts.pending,
            "synced": counts.synced,
            "total": counts.total(),
        });
        if args.pending {
            out["pending_records"] = serde_json::to_value(&pending)?;
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("synced   {}", counts.synced);
    println!("pending  {}", counts.pending);
    println!("total    {}", counts.total());

    if args.pending {
        if pending.is_empty() {
            println!("\nno pending entries");
        } else {
            println!();
            for r in &pending {
                let title = r.description.as_deref().unwrap_or("-");
                println!(
                    "{}  {}  {}",
                    r.start_time.format("%Y-%m-%d %H:%M"),
                    r.id,
                    title
                );
            }
        }
    }
    Ok(())
}
