//! TOML-based configuration with environment overrides.
//!
//! Configuration is stored at `~/.config/clockcal/config.toml`
//! (`~/.config/clockcal-dev/` when `CLOCKCAL_ENV=dev`). The following
//! environment variables take precedence over the file:
//!
//! | Variable             | Key                    |
//! |----------------------|------------------------|
//! | `CLOCKIFY_API_KEY`   | `clockify.api_key`     |
//! | `WORKSPACE_ID`       | `clockify.workspace_id`|
//! | `USER_ID`            | `clockify.user_id`     |
//! | `GOOGLE_CALENDAR_ID` | `google.calendar_id`   |
//! | `CLOCKCAL_DATABASE`  | `sync.database_path`   |
//!
//! A [`Config`] is built once at startup and passed by reference; nothing in
//! the core reads the environment on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::WriteOrder;
use crate::entry::DEFAULT_COLOR_ID;
use crate::error::ConfigError;
use crate::oauth::GOOGLE_TOKEN_URL;
use crate::sink::GOOGLE_CALENDAR_API;

pub const CLOCKIFY_API: &str = "https://api.clockify.me/api/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_MAX_PAGES: u32 = 10;
pub const DEFAULT_LOOKBACK_HOURS: u32 = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const LEDGER_FILE: &str = "time_entries.db";

/// Returns `~/.config/clockcal[-dev]/` based on CLOCKCAL_ENV.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");

    let env = std::env::var("CLOCKCAL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("clockcal-dev")
    } else {
        base_dir.join("clockcal")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Clockify (entry source) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockifyConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_clockify_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

/// Google Calendar (sink) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default = "default_google_url")]
    pub base_url: String,
    /// Event color; `None` leaves the calendar default. Stored as `""`.
    #[serde(default = "default_color_id", with = "blank_as_none")]
    pub color_id: Option<String>,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// OAuth client; falls back to the keyring when unset.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Ledger location; defaults to `<data dir>/time_entries.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    #[serde(default = "default_timeout_secs")]
    pub source_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub sink_timeout_secs: u64,
    #[serde(default)]
    pub write_order: WriteOrder,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clockify: ClockifyConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_clockify_url() -> String {
    CLOCKIFY_API.into()
}
fn default_google_url() -> String {
    GOOGLE_CALENDAR_API.into()
}
fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.into()
}
fn default_color_id() -> Option<String> {
    Some(DEFAULT_COLOR_ID.into())
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}
fn default_lookback_hours() -> u32 {
    DEFAULT_LOOKBACK_HOURS
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ClockifyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            workspace_id: None,
            user_id: None,
            base_url: default_clockify_url(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            calendar_id: None,
            base_url: default_google_url(),
            color_id: default_color_id(),
            token_url: default_token_url(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            source_timeout_secs: DEFAULT_TIMEOUT_SECS,
            sink_timeout_secs: DEFAULT_TIMEOUT_SECS,
            write_order: WriteOrder::default(),
        }
    }
}

/// Optional string written as `""` when unset, so clearing it survives a save.
mod blank_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(d)?;
        Ok(value.filter(|v| !v.trim().is_empty()))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl ClockifyConfig {
    /// Required keys that are unset or blank.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.api_key) {
            missing.push("clockify.api_key");
        }
        if is_blank(&self.workspace_id) {
            missing.push("clockify.workspace_id");
        }
        if is_blank(&self.user_id) {
            missing.push("clockify.user_id");
        }
        missing
    }
}

impl Config {
    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, then apply environment overrides.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::load_from(&Self::path()?)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_err = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_err(e.to_string()))
    }

    /// Override file values with non-empty environment values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("CLOCKIFY_API_KEY") {
            self.clockify.api_key = Some(v);
        }
        if let Some(v) = var("WORKSPACE_ID") {
            self.clockify.workspace_id = Some(v);
        }
        if let Some(v) = var("USER_ID") {
            self.clockify.user_id = Some(v);
        }
        if let Some(v) = var("GOOGLE_CALENDAR_ID") {
            self.google.calendar_id = Some(v);
        }
        if let Some(v) = var("CLOCKCAL_DATABASE") {
            self.sync.database_path = Some(PathBuf::from(v));
        }
    }

    /// Check that everything a sync run needs is present.
    ///
    /// # Errors
    /// [`ConfigError::MissingKeys`] naming every missing key, or
    /// [`ConfigError::InvalidValue`] for out-of-range tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = self.clockify.missing_keys();
        if is_blank(&self.google.calendar_id) {
            missing.push("google.calendar_id");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        if self.clockify.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "clockify.page_size".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.sync.lookback_hours == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sync.lookback_hours".into(),
                message: "must be at least 1".into(),
            });
        }
        for (key, secs) in [
            ("sync.source_timeout_secs", self.sync.source_timeout_secs),
            ("sync.sink_timeout_secs", self.sync.sink_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be at least 1 second".into(),
                });
            }
        }
        Ok(())
    }

    /// Ledger file to use.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.sync.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(LEDGER_FILE)),
        }
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value does not parse.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| invalid("expected <section>.<field>".into()))?;

        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let obj = json
            .get_mut(section)
            .and_then(|s| s.as_object_mut())
            .ok_or_else(|| invalid("unknown config key".into()))?;
        if !obj.contains_key(field) {
            return Err(invalid("unknown config key".into()));
        }

        let new_value = match obj.get(field) {
            Some(serde_json::Value::Bool(_)) => {
                let b: bool = value
                    .parse()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?;
                serde_json::Value::Bool(b)
            }
            Some(serde_json::Value::Number(_)) => {
                let n: u64 = value
                    .parse()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                serde_json::Value::Number(n.into())
            }
            _ if value.is_empty() => serde_json::Value::Null,
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(field.to_string(), new_value);

        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}
