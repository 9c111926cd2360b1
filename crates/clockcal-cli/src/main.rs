use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod commands;

#[derive(Parser)]
#[command(
    name = "clockcal",
    version,
    about = "Mirror finished Clockify time entries into Google Calendar"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass over the lookback window
    Sync(commands::sync::SyncArgs),
    /// Show ledger state
    Status(commands::status::StatusArgs),
    /// Create the ledger database if it does not exist
    Init,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Clockify account helpers
    Clockify {
        #[command(subcommand)]
        action: commands::clockify::ClockifyAction,
    },
    /// Credential management for the calendar
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into()),
        1 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Sync(args) => commands::sync::run(args).await,
        Commands::Status(args) => commands::status::run(args),
        Commands::Init => commands::init::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Clockify { action } => commands::clockify::run(action).await,
        Commands::Auth { action } => commands::auth::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
