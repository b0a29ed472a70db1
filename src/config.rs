//! # Feature: Configuration System
//!
//! Loads bot settings from a YAML file or from environment variables.
//!
//! Priority order:
//! 1. `CONFIG_FILE` environment variable pointing at a YAML file
//! 2. `config.yaml` in the working directory
//! 3. environment variables
//!
//! YAML files may reference the environment with `${VAR}` or `${VAR:-default}`.

use anyhow::{Context, Result};
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token (required)
    pub discord_token: String,

    /// JSON array of banned words
    #[serde(default = "default_banned_words_path")]
    pub banned_words_path: String,

    /// JSON object mapping community id to welcome channel id
    #[serde(default = "default_welcome_config_path")]
    pub welcome_config_path: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dev mode guild ID (commands are registered to this guild only)
    #[serde(default)]
    pub discord_guild_id: Option<String>,

    /// Seconds between presence updates
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,

    /// Seconds before a moderation warning is removed
    #[serde(default = "default_warning_ttl")]
    pub warning_ttl_secs: u64,

    /// Port of the liveness endpoint
    #[serde(default = "default_keep_alive_port")]
    pub keep_alive_port: u16,

    /// Community name used in presence, welcome and report text
    #[serde(default = "default_community_name")]
    pub community_name: String,
}

// Default value functions for serde
fn default_banned_words_path() -> String {
    "banned_words.json".to_string()
}

fn default_welcome_config_path() -> String {
    "welcome_config.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_status_interval() -> u64 {
    30
}

fn default_warning_ttl() -> u64 {
    5
}

fn default_keep_alive_port() -> u16 {
    8080
}

fn default_community_name() -> String {
    "PDR Community".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let discord_token = env::var("DISCORD_TOKEN")
            .or_else(|_| env::var("TOKEN"))
            .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN environment variable not set"))?;

        let config = Config {
            discord_token,
            banned_words_path: env::var("BANNED_WORDS_PATH")
                .unwrap_or_else(|_| default_banned_words_path()),
            welcome_config_path: env::var("WELCOME_CONFIG_PATH")
                .unwrap_or_else(|_| default_welcome_config_path()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            discord_guild_id: env::var("DISCORD_GUILD_ID").ok(),
            status_interval_secs: parse_env("STATUS_INTERVAL_SECS", default_status_interval())?,
            warning_ttl_secs: parse_env("WARNING_TTL_SECS", default_warning_ttl())?,
            keep_alive_port: parse_env("KEEP_ALIVE_PORT", default_keep_alive_port())?,
            community_name: env::var("COMMUNITY_NAME")
                .unwrap_or_else(|_| default_community_name()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable interpolation
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let interpolated = interpolate_env_vars(&content)?;

        let config: Config = serde_yaml::from_str(&interpolated)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Auto-detect and load configuration
    pub fn auto_load() -> Result<Self> {
        if let Ok(config_path) = env::var("CONFIG_FILE") {
            info!("Loading config from CONFIG_FILE: {}", config_path);
            return Self::from_file(&config_path);
        }

        let default_config_path = "config.yaml";
        if Path::new(default_config_path).exists() {
            info!("Loading config from {}", default_config_path);
            return Self::from_file(default_config_path);
        }

        info!("No config file found, using environment variables");
        Self::from_env()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("discord_token is required");
        }

        if self.status_interval_secs == 0 {
            anyhow::bail!("status_interval_secs must be at least 1");
        }

        if let Some(ref guild_id) = self.discord_guild_id {
            if guild_id.parse::<u64>().is_err() {
                anyhow::bail!("discord_guild_id '{}' is not a numeric id", guild_id);
            }
        }

        Ok(())
    }

    /// Development guild, if commands should be registered to one guild only
    pub fn guild_id(&self) -> Option<u64> {
        self.discord_guild_id.as_ref().and_then(|id| id.parse().ok())
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn warning_ttl(&self) -> Duration {
        Duration::from_secs(self.warning_ttl_secs)
    }
}

/// Parse an optional numeric environment variable
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

// ============================================================================
// Environment Variable Interpolation
// ============================================================================

/// Interpolate environment variables in a string
///
/// Supports `${VAR_NAME}` syntax. If a variable is not set, returns an error.
/// Use `${VAR_NAME:-default}` for default values.
fn interpolate_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .context("Invalid interpolation pattern")?;

    let mut errors = Vec::new();
    let result = re.replace_all(content, |cap: &regex::Captures| {
        let var_name = &cap[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    errors.push(format!("Environment variable '{}' is not set", var_name));
                    String::new()
                }
            },
        }
    });

    if !errors.is_empty() {
        anyhow::bail!("Missing environment variables:\n  - {}", errors.join("\n  - "));
    }

    Ok(result.into_owned())
}

// ============================================================================
// Tests
// ============================================================================
