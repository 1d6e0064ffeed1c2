// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of VehInfo.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vehinfo_ha::client::SUPERVISOR_BASE_URL;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "vehinfo.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration of the `vehinfo` tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Home Assistant connection
    #[serde(default)]
    pub ha: HaSettings,

    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// File the configuration was read from, `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Home Assistant connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaSettings {
    /// Base URL of Home Assistant (e.g. "http://homeassistant.local:8123")
    #[serde(default)]
    pub base_url: Option<String>,

    /// Long-lived access token
    #[serde(default)]
    pub token: Option<String>,

    /// Timeout for one registry query (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for HaSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ha: HaSettings::default(),
            log_level: default_log_level(),
            source: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, else `vehinfo.toml`, else defaults.
    ///
    /// Environment variables fill in whatever the file leaves unset.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML or JSON file, chosen by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };

        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Fill unset connection values from HA_BASE_URL, HA_TOKEN or SUPERVISOR_TOKEN
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.ha.base_url.is_none() {
            self.ha.base_url = lookup("HA_BASE_URL");
        }
        if self.ha.token.is_none() {
            self.ha.token = lookup("HA_TOKEN");
        }

        // Running as an add-on
        if self.ha.token.is_none()
            && let Some(token) = lookup("SUPERVISOR_TOKEN")
        {
            self.ha.token = Some(token);
            if self.ha.base_url.is_none() {
                self.ha.base_url = Some(SUPERVISOR_BASE_URL.to_owned());
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log_level '{}', expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }

        if let Some(url) = &self.ha.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            anyhow::bail!("ha.base_url must start with http:// or https://, got '{url}'");
        }

        if self.ha.token.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("ha.token is set but empty");
        }

        if self.ha.timeout_secs == 0 {
            anyhow::bail!("ha.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.ha.timeout_secs)
    }
}
