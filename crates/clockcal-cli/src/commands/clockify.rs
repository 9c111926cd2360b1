use clap::Subcommand;
use clockcal_core::{ClockifySource, Config, ConfigError};

#[derive(Subcommand)]
pub enum ClockifyAction {
    /// Show the Clockify user that owns the configured API key
    Whoami {
        /// Store the user id (and workspace id, if unset) in the config file
        #[arg(long)]
        save: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: ClockifyAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ClockifyAction::Whoami { save, json } => whoami(save, json).await,
    }
}

async fn whoami(save: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let api_key = config
        .clockify
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or(ConfigError::MissingKeys(vec!["clockify.api_key"]))?;

    let user = ClockifySource::current_user(&config.clockify.base_url, api_key).await?;
    let workspace = user
        .active_workspace
        .as_deref()
        .or(user.default_workspace.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("user_id:      {}", user.id);
        if let Some(name) = &user.name {
            println!("name:         {name}");
        }
        if let Some(email) = &user.email {
            println!("email:        {email}");
        }
        if let Some(ws) = workspace {
            println!("workspace_id: {ws}");
        }
    }

    if save {
        let path = Config::path()?;
        let mut file_config = Config::load_from(&path)?;
        file_config.clockify.user_id = Some(user.id.clone());
        let workspace_unset = file_config
            .clockify
            .workspace_id
            .as_deref()
            .map_or(true, |w| w.trim().is_empty());
        if workspace_unset {
            if let Some(ws) = workspace {
                file_config.clockify.workspace_id = Some(ws.to_string());
            }
        }
        file_config.save_to(&path)?;
        tracing::info!(path = %path.display(), "saved clockify user id");
        eprintln!("saved to {}", path.display());
    }
    Ok(())
}
