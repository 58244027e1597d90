//! # Feature: Configuration System
//!
//! Configuration from environment variables, with an optional YAML file for
//! deployments that prefer one. The file supports `${VAR}` and
//! `${VAR:-default}` interpolation so secrets can stay in the environment.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release

use anyhow::{Context, Result};
use chrono::FixedOffset;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::quota::DEFAULT_DAILY_ALLOWANCE;

/// Bot configuration
///
/// The Discord token is the only hard startup requirement. A missing OpenAI
/// key does not prevent startup; AI invocations simply fail and surface as
/// error replies, the same way the original behaved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token (required)
    pub discord_token: String,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: String,

    /// The one user allowed to run `/reset`; unset denies everyone
    #[serde(default)]
    pub admin_user_id: Option<u64>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Chat completion model
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Image generation model
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Generated image size
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// AI invocations allowed per user per day
    #[serde(default = "default_daily_quota")]
    pub daily_quota: i32,

    /// UTC offset (hours) whose midnight triggers the daily quota reset
    #[serde(default = "default_reset_utc_offset_hours")]
    pub reset_utc_offset_hours: i32,
}

// Default value functions for serde
fn default_log_level() -> String {
    "info".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_daily_quota() -> i32 {
    DEFAULT_DAILY_ALLOWANCE
}

fn default_reset_utc_offset_hours() -> i32 {
    9
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `BOT_TOKEN` and `API_KEY` are the variable names the original
    /// deployment used; only the former is mandatory.
    pub fn from_env() -> Result<Self> {
        let config = Config {
            discord_token: env::var("BOT_TOKEN")
                .map_err(|_| anyhow::anyhow!("BOT_TOKEN environment variable not set"))?,
            openai_api_key: env::var("API_KEY").unwrap_or_default(),
            admin_user_id: env::var("ADMIN_USER_ID").ok().and_then(|v| v.parse().ok()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| default_chat_model()),
            image_model: env::var("IMAGE_MODEL").unwrap_or_else(|_| default_image_model()),
            image_size: env::var("IMAGE_SIZE").unwrap_or_else(|_| default_image_size()),
            daily_quota: env::var("DAILY_QUOTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_daily_quota),
            reset_utc_offset_hours: env::var("RESET_UTC_OFFSET_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_reset_utc_offset_hours),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with `${VAR}` interpolation.
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

    /// Auto-detect and load configuration.
    ///
    /// Priority order:
    /// 1. If CONFIG_FILE env var is set, load from that file
    /// 2. If config.yaml exists in the current directory, load from it
    /// 3. Fall back to plain environment variables
    pub fn auto_load() -> Result<Self> {
        if let Ok(config_path) = env::var("CONFIG_FILE") {
            return Self::from_file(&config_path);
        }

        let default_config_path = "config.yaml";
        if Path::new(default_config_path).exists() {
            return Self::from_file(default_config_path);
        }

        Self::from_env()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.is_empty() {
            anyhow::bail!("discord_token is required");
        }
        if self.daily_quota < 1 {
            anyhow::bail!("daily_quota must be at least 1, got {}", self.daily_quota);
        }
        if !(-12..=14).contains(&self.reset_utc_offset_hours) {
            anyhow::bail!(
                "reset_utc_offset_hours must be between -12 and 14, got {}",
                self.reset_utc_offset_hours
            );
        }
        Ok(())
    }

    /// The fixed offset whose midnight triggers the daily reset.
    pub fn reset_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.reset_utc_offset_hours * 3600)
            .expect("reset_utc_offset_hours is range-checked by validate()")
    }
}

/// Interpolate environment variables in a string.
///
/// Supports `${VAR_NAME}` and `${VAR_NAME:-default}`. A referenced variable
/// without a default that is not set is an error.
fn interpolate_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex");

    let mut result = content.to_string();
    let mut missing = Vec::new();

    for cap in re.captures_iter(content) {
        let placeholder = cap.get(0).map(|m| m.as_str()).unwrap_or_default();
        let var_name = &cap[1];
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match env::var(var_name) {
            Ok(v) => v,
            Err(_) => match default_value {
                Some(default) => default.to_string(),
                None => {
                    missing.push(var_name.to_string());
                    continue;
                }
            },
        };

        result = result.replace(placeholder, &value);
    }

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variables: {}", missing.join(", "));
    }

    Ok(result)
}
