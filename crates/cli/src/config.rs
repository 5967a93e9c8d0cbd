//! Persistent CLI preferences

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Keys accepted by `vap config set`
pub const KEYS: &[&str] = &["api_url", "default_format", "chat_url", "chat_model"];

/// CLI preferences stored in `~/.config/vap/config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend URL used when `--api-url` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Default output format (table or json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
    /// Chat server base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_url: Option<String>,
    /// Chat model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Set one key; an empty value clears it
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match key {
            "api_url" => self.api_url = value,
            "default_format" => {
                if let Some(format) = value.as_deref() {
                    if !matches!(format, "table" | "json") {
                        bail!("default_format must be 'table' or 'json', got '{}'", format);
                    }
                }
                self.default_format = value;
            }
            "chat_url" => self.chat_url = value,
            "chat_model" => self.chat_model = value,
            other => bail!("Unknown key '{}', expected one of: {}", other, KEYS.join(", ")),
        }
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("vap").join("config.json"))
    }
}
