//! # configs
//!
//! Layered settings for reel-review, read once at startup.
//!
//! Precedence (lowest first): built-in defaults, an optional `config.{toml,json,yaml}`
//! file (name overridable with `REEL_REVIEW_CONFIG`), a `.env` file, then
//! `REEL_REVIEW__SECTION__KEY` environment variables.

use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ENV_PREFIX: &str = "REEL_REVIEW";
pub const CONFIG_PATH_VAR: &str = "REEL_REVIEW_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub discord: DiscordSettings,
    #[serde(default)]
    pub moderation: ModerationSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the built review tool; `None` serves the API only.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
    pub token: SecretString,
    /// The monitored upload channel
    pub channel_id: String,
    pub guild_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Shared secret a gateway relay must present on `POST /internal/events`.
    /// Unset disables the relay route entirely.
    #[serde(default)]
    pub relay_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationSettings {
    #[serde(default = "default_true")]
    pub ban_enabled: bool,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self { ban_enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_true() -> bool {
    true
}

fn default_state_path() -> PathBuf {
    PathBuf::from("state.json")
}

impl Settings {
    /// Loads `.env`, the optional config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => debug!("no .env file found"),
            Err(e) => warn!(error = %e, "failed to read .env, continuing"),
        }

        let file = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config".to_string());
        Self::from_sources(&file, Environment::with_prefix(ENV_PREFIX))
    }

    /// Builds settings from a config file base name (extension optional, file
    /// optional) and an environment source.
    pub fn from_sources(file: &str, env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                env.prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid("discord.token must not be empty".into()));
        }
        if self.discord.channel_id.trim().is_empty() {
            return Err(ConfigError::Invalid("discord.channel_id must not be empty".into()));
        }
        if self.discord.guild_id.trim().is_empty() {
            return Err(ConfigError::Invalid("discord.guild_id must not be empty".into()));
        }
        if self
            .discord
            .relay_secret
            .as_ref()
            .is_some_and(|s| s.expose_secret().trim().is_empty())
        {
            return Err(ConfigError::Invalid("discord.relay_secret must not be blank when set".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
