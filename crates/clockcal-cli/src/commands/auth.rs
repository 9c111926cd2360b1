use clap::Subcommand;
use clockcal_core::oauth::{
    keyring_store, load_tokens, refresh_access_token, save_tokens, OAuthConfig, GOOGLE_SERVICE,
};
use clockcal_core::{Config, KeyringTokens};

const CLIENT_ID_KEY: &str = "google_client_id";
const CLIENT_SECRET_KEY: &str = "google_client_secret";

#[derive(Subcommand)]
pub enum AuthAction {
    /// Google Calendar: login / logout / status
    Google {
        #[command(subcommand)]
        action: AuthOp,
    },
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Store OAuth client credentials and a refresh token
    Login {
        /// OAuth client ID
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret
        #[arg(long)]
        client_secret: Option<String>,
        /// Refresh token obtained from the Google consent flow
        #[arg(long)]
        refresh_token: String,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

pub async fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Google { action: op } => handle_google(op).await,
    }
}

/// OAuth settings for the Google token endpoint.
///
/// Client credentials come from the config file when set there, otherwise
/// from the keyring entries written by `auth google login`.
pub fn google_oauth_config(config: &Config) -> OAuthConfig {
    let client_id = match config.google.client_id.clone() {
        Some(id) if !id.is_empty() => id,
        _ => stored(CLIENT_ID_KEY),
    };
    let client_secret = match config.google.client_secret.clone() {
        Some(secret) if !secret.is_empty() => secret,
        _ => stored(CLIENT_SECRET_KEY),
    };
    OAuthConfig {
        service_name: GOOGLE_SERVICE.to_string(),
        client_id,
        client_secret,
        token_url: config.google.token_url.clone(),
    }
}

fn stored(key: &str) -> String {
    match keyring_store::get(key) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "keyring unavailable");
            String::new()
        }
    }
}

async fn handle_google(op: AuthOp) -> Result<(), Box<dyn std::error::Error>> {
    match op {
        AuthOp::Login {
            client_id,
            client_secret,
            refresh_token,
        } => {
            if let Some(cid) = &client_id {
                keyring_store::set(CLIENT_ID_KEY, cid)?;
            }
            if let Some(csec) = &client_secret {
                keyring_store::set(CLIENT_SECRET_KEY, csec)?;
            }

            let config = Config::load()?;
            let oauth = google_oauth_config(&config);
            if oauth.client_id.is_empty() || oauth.client_secret.is_empty() {
                return Err("--client-id and --client-secret required for Google".into());
            }

            let http = reqwest::Client::new();
            let tokens = refresh_access_token(&http, &oauth, &refresh_token).await?;
            save_tokens(GOOGLE_SERVICE, &tokens)?;
            println!("Google authenticated");
        }
        AuthOp::Logout => {
            keyring_store::delete(GOOGLE_SERVICE)?;
            keyring_store::delete(CLIENT_ID_KEY)?;
            keyring_store::delete(CLIENT_SECRET_KEY)?;
            println!("Google disconnected");
        }
        AuthOp::Status => {
            let config = Config::load()?;
            let tokens = KeyringTokens::new(google_oauth_config(&config));
            if !tokens.is_authenticated() {
                println!("not authenticated");
                return Ok(());
            }
            match load_tokens(GOOGLE_SERVICE)?.and_then(|t| t.expires_at) {
                Some(exp) => {
                    let when = chrono::DateTime::from_timestamp(exp, 0)
                        .map(|d| d.to_rfc3339())
                        .unwrap_or_else(|| exp.to_string());
                    println!("authenticated (access token expires {when})");
                }
                None => println!("authenticated"),
            }
        }
    }
    Ok(())
}
