//! Application configuration loaded from `remaster.toml`

use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{clamp_intensity, Enhancement, DEFAULT_PRESET};

pub const CONFIG_FILE: &str = "remaster.toml";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoints
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    /// Push channel; derived from `base_url` when absent
    pub channel_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            channel_url: None,
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn channel_url(&self) -> String {
        if let Some(url) = &self.channel_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}/ws")
    }
}

/// Mastering tier the session starts with, plus the presets `p` cycles through
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub enabled: bool,
    pub preset: String,
    pub intensity: f64,
    pub presets: Vec<String>,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: DEFAULT_PRESET.to_string(),
            intensity: 0.5,
            presets: vec![
                DEFAULT_PRESET.to_string(),
                "warm".to_string(),
                "bright".to_string(),
                "loud".to_string(),
            ],
        }
    }
}

impl EnhancementConfig {
    pub fn initial(&self) -> Enhancement {
        Enhancement::new(self.enabled, self.preset.clone(), self.intensity)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub page_size: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self { page_size: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { directory: ".logs".to_string() }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("parsing configuration")?;
        Ok(config.sanitized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Loads `path`, falling back to defaults. Returns the reason when the
    /// file could not be used so the caller can log it once logging is up.
    pub fn load_or_default(path: &Path) -> (Self, Option<String>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(format!("{e:#}"))),
        }
    }

    fn sanitized(mut self) -> Self {
        self.enhancement.intensity = clamp_intensity(self.enhancement.intensity);
        if self.enhancement.presets.is_empty() {
            self.enhancement.presets = EnhancementConfig::default().presets;
        }
        if !self.enhancement.presets.contains(&self.enhancement.preset) {
            self.enhancement.presets.insert(0, self.enhancement.preset.clone());
        }
        self.library.page_size = self.library.page_size.max(1);
        self.server.request_timeout_secs = self.server.request_timeout_secs.max(1);
        self
    }
}
