use clap::Subcommand;
use clockcal_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (file plus environment)
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Get a config value
    Get {
        /// Config key (e.g. "sync.lookback_hours", "google.calendar_id")
        key: String,
    },
    /// Set a config value in the file
    Set {
        /// Config key
        key: String,
        /// New value (empty to unset)
        value: String,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            let mut shown = config.clone();
            if shown.clockify.api_key.is_some() {
                shown.clockify.api_key = Some("********".into());
            }
            if shown.google.client_secret.is_some() {
                shown.google.client_secret = Some("********".into());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Init { force } => {
            let path = Config::path()?;
            if path.exists() && !force {
                return Err(format!("{} already exists (use --force)", path.display()).into());
            }
            Config::default().save_to(&path)?;
            println!("wrote {}", path.display());
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let path = Config::path()?;
            // File values only; environment overrides are not persisted.
            let mut config = Config::load_from(&path)?;
            config.set(&key, &value)?;
            config.save_to(&path)?;
            println!("ok");
        }
    }
    Ok(())
}
