//! OAuth2 access tokens for the calendar sink.
//!
//! Only the refresh-token grant is implemented. Tokens live in the OS
//! keyring; the interactive consent flow happens outside clockcal, and the
//! resulting refresh token is stored with `clockcal auth google login`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::OAuthError;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Keyring entry holding the serialized Google tokens.
pub const GOOGLE_SERVICE: &str = "google";

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "clockcal";

    pub fn get(key: &str) -> Result<Option<String>, keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)
    }

    pub fn delete(key: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>, // Unix timestamp
    pub token_type: String,
    pub scope: Option<String>,
}

impl OAuthTokens {
    /// Tokens holding only a refresh token; the first use refreshes them.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: Some(refresh_token.into()),
            expires_at: Some(0),
            token_type: "Bearer".to_string(),
            scope: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub service_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

/// Check if tokens are expired (with 60s buffer).
pub fn is_expired(tokens: &OAuthTokens) -> bool {
    match tokens.expires_at {
        Some(exp) => chrono::Utc::now().timestamp() > exp - 60,
        None => tokens.access_token.is_empty(),
    }
}

/// Exchange a refresh token for a fresh access token.
///
/// The returned tokens keep `refresh` when the server does not rotate it.
pub async fn refresh_access_token(
    http: &Client,
    config: &OAuthConfig,
    refresh: &str,
) -> Result<OAuthTokens, OAuthError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh),
        ("grant_type", "refresh_token"),
    ];

    let body: serde_json::Value = http
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    if let Some(error) = body.get("error") {
        return Err(OAuthError::TokenRefreshFailed(error.to_string()));
    }

    let access_token = body["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OAuthError::TokenRefreshFailed("no access_token in response".into()))?
        .to_string();

    let expires_in = body.get("expires_in").and_then(|v| v.as_i64());
    let expires_at = expires_in.map(|ei| chrono::Utc::now().timestamp() + ei);

    Ok(OAuthTokens {
        access_token,
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| Some(refresh.to_string())),
        expires_at,
        token_type: body["token_type"].as_str().unwrap_or("Bearer").to_string(),
        scope: body.get("scope").and_then(|v| v.as_str()).map(String::from),
    })
}

/// Load stored tokens from the keyring.
pub fn load_tokens(service_name: &str) -> Result<Option<OAuthTokens>, OAuthError> {
    match keyring_store::get(service_name)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Persist tokens to the keyring.
pub fn save_tokens(service_name: &str, tokens: &OAuthTokens) -> Result<(), OAuthError> {
    let json = serde_json::to_string(tokens)?;
    keyring_store::set(service_name, &json)?;
    Ok(())
}

/// Supplies a bearer token for each calendar call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, OAuthError>;
}

/// A fixed token, for tests and externally managed credentials.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, OAuthError> {
        Ok(self.0.clone())
    }
}

/// Tokens kept in the OS keyring, refreshed when expired.
#[derive(Debug)]
pub struct KeyringTokens {
    config: OAuthConfig,
    http: Client,
}

impl KeyringTokens {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(load_tokens(&self.config.service_name), Ok(Some(_)))
    }
}

#[async_trait]
impl TokenProvider for KeyringTokens {
    async fn access_token(&self) -> Result<String, OAuthError> {
        let service = &self.config.service_name;
        let tokens = load_tokens(service)?.ok_or_else(|| OAuthError::NotAuthenticated {
            service: service.clone(),
        })?;

        if !is_expired(&tokens) {
            return Ok(tokens.access_token);
        }

        let refresh = tokens
            .refresh_token
            .as_deref()
            .ok_or(OAuthError::TokenExpired)?;
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(OAuthError::CredentialsNotConfigured {
                service: service.clone(),
            });
        }

        let refreshed = refresh_access_token(&self.http, &self.config, refresh).await?;
        save_tokens(service, &refreshed)?;
        tracing::debug!(service = %service, "refreshed access token");
        Ok(refreshed.access_token)
    }
}
