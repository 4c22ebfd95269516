//! The `Config` struct and its persistence helpers.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - `load_from_path` / `save_to_path` for explicit locations
//! - XDG-style path helpers (`config_path`, `config_dir`)
//! - Semantic validation (`validate`)

use crate::defaults;
use crate::env_vars::{pre_scan_allow_all_env_vars, substitute_variables_with_allowlist};
use crate::error::ConfigError;
use crate::strings::UploadStrings;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log level for the debug log file.
///
/// `RUST_LOG` and the `--log-level` CLI flag take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging (log file not created)
    #[default]
    Off,
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Most verbose
    Trace,
}

impl LogLevel {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Anti-forgery tokens handed out by the host page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UploadNonces {
    /// Token attached to every file-upload request.
    #[serde(default)]
    pub file_upload: String,
}

/// Process-wide upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Base URL of the upload endpoint
    #[serde(default = "crate::defaults::ajax_url")]
    pub ajax_url: String,

    /// Endpoint action, sent as `?action=<upload_action>`
    #[serde(default = "crate::defaults::upload_action")]
    pub upload_action: String,

    /// Anti-forgery tokens
    #[serde(default)]
    pub nonces: UploadNonces,

    /// Localized message templates
    #[serde(default)]
    pub strings: UploadStrings,

    /// Delay before a finished progress bar is cleared
    #[serde(default = "crate::defaults::progress_reset_delay_ms")]
    pub progress_reset_delay_ms: u64,

    /// Debug log verbosity
    #[serde(default)]
    pub log_level: LogLevel,

    /// Resolve every environment variable during substitution, not just the allowlist
    #[serde(default)]
    pub allow_all_env_vars: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ajax_url: defaults::ajax_url(),
            upload_action: defaults::upload_action(),
            nonces: UploadNonces::default(),
            strings: UploadStrings::default(),
            progress_reset_delay_ms: defaults::progress_reset_delay_ms(),
            log_level: LogLevel::default(),
            allow_all_env_vars: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upload nonce
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonces.file_upload = nonce.into();
        self
    }

    /// Set the progress reset delay
    pub fn with_progress_reset_delay_ms(mut self, delay_ms: u64) -> Self {
        self.progress_reset_delay_ms = delay_ms;
        self
    }

    /// Full upload URL: `<ajax_url>?action=<upload_action>`
    pub fn upload_url(&self) -> String {
        format!("{}?action={}", self.ajax_url, self.upload_action)
    }

    /// Parse a YAML document, applying environment substitution first.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let allow_all = pre_scan_allow_all_env_vars(contents);
        let contents = substitute_variables_with_allowlist(contents, allow_all);
        let config: Config =
            serde_yaml_ng::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default path, or create it with defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            log::info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            if let Err(e) = config.save() {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        log::info!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::from_yaml(&contents)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path())
    }

    /// Save configuration to an explicit path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::from)?;

        // Atomic save: write to temp file then rename
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::from)?;
        fs::rename(&temp_path, path).map_err(ConfigError::from)?;

        Ok(())
    }

    /// Get the configuration file path (`~/.config/field-upload/config.yaml`)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("field-upload")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("field-upload")
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Check semantic constraints that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.ajax_url.trim().is_empty() {
            return Err(ConfigError::Validation("ajax_url must not be empty".into()));
        }
        if self.upload_action.trim().is_empty() {
            return Err(ConfigError::Validation(
                "upload_action must not be empty".into(),
            ));
        }
        if self.progress_reset_delay_ms > defaults::MAX_PROGRESS_RESET_DELAY_MS {
            return Err(ConfigError::Validation(format!(
                "progress_reset_delay_ms must be <= {} (got {})",
                defaults::MAX_PROGRESS_RESET_DELAY_MS,
                self.progress_reset_delay_ms
            )));
        }
        if self.nonces.file_upload.is_empty() {
            log::warn!("nonces.file_upload is empty; uploads will likely be rejected");
        }
        Ok(())
    }
}
