//! Configuration file management
//!
//! Loads TOML configuration files and provides lookup settings.
//! Default config path: ~/.config/keytrans/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lookup settings
    pub lookup: LookupConfig,
    /// X display settings (xim backend)
    pub display: DisplayConfig,
    /// Keymap settings (xkb backend)
    pub keyboard: KeyboardConfig,
}

/// Lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Backend: "xim" (X input method, default) or "xkb" (xkbcommon keymap)
    pub backend: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            backend: "xim".to_string(),
        }
    }
}

/// X display settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display name (e.g. ":0"; empty = $DISPLAY)
    pub name: String,
    /// Locale modifiers for XSetLocaleModifiers (e.g. "@im=none"; empty = $XMODIFIERS)
    pub locale_modifiers: String,
}

/// Keymap settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// XKB rules (empty = default)
    pub xkb_rules: String,
    /// XKB keyboard model (empty = default)
    pub xkb_model: String,
    /// XKB keyboard layout (e.g., "us", "de", empty = default)
    pub xkb_layout: String,
    /// XKB keyboard variant (empty = default)
    pub xkb_variant: String,
    /// XKB keyboard options (e.g., "compose:ralt", empty = default)
    pub xkb_options: String,
}

impl Config {
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/keytrans/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. KEYTRANS_CONFIG environment variable
        if let Ok(path) = std::env::var("KEYTRANS_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
            warn!("KEYTRANS_CONFIG points to missing file: {}", path);
        }

        // 2. User config: ~/.config/keytrans/config.toml
        if let Some(config_path) = default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/keytrans/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. KEYTRANS_CONFIG environment variable
    /// 2. ~/.config/keytrans/config.toml (user config)
    /// 3. /etc/keytrans/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize settings as TOML (for --print-config)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keytrans").join("config.toml"))
}
