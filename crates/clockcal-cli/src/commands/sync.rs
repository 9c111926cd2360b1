//! One reconciliation pass: Clockify window in, Google Calendar events out.

use clap::Args;
use clockcal_core::{
    ClockifySource, Config, EngineSettings, GoogleCalendarSink, KeyringTokens, PassReport,
    SyncEngine,
};

use super::auth::google_oauth_config;
use super::open_ledger;

#[derive(Args)]
pub struct SyncArgs {
    /// Lookback window in hours (defaults to sync.lookback_hours)
    #[arg(long)]
    hours: Option<u32>,
    /// Print the pass report as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(hours) = args.hours {
        config.sync.lookback_hours = hours;
    }
    config.validate()?;

    let source = ClockifySource::from_config(&config.clockify)?;
    let calendar_id = config.google.calendar_id.clone().unwrap_or_default();
    let tokens = KeyringTokens::new(google_oauth_config(&config));
    let sink = GoogleCalendarSink::new(
        config.google.base_url.clone(),
        calendar_id,
        Box::new(tokens),
    );
    let ledger = open_ledger(&config)?;

    let mut engine = SyncEngine::new(ledger, sink, EngineSettings::from_config(&config));
    let report = engine
        .run_pass(&source, chrono::Utc::now(), config.sync.lookback_hours)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(e) = &report.fetch_error {
        return Err(format!("could not fetch time entries: {e}").into());
    }
    Ok(())
}

fn print_report(report: &PassReport) {
    let s = &report.summary;
    println!(
        "window {} .. {}",
        report.window.start.format("%Y-%m-%d %H:%M"),
        report.window.end.format("%Y-%m-%d %H:%M")
    );
    println!("fetched        {}", report.fetched);
    println!("processed      {}", s.processed);
    println!("newly synced   {}", s.newly_synced);
    println!("still pending  {}", s.still_pending);
    println!("already synced {}", s.already_synced);
    println!("errors         {}", s.errors);
}
