//! Web front end configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working server on `127.0.0.1:5000` that stages uploads under `uploads/`.
//!
//! ```toml
//! bind_address = "0.0.0.0:8080"
//! upload_dir = "/var/tmp/scenecut"
//! allowed_extensions = ["mp4", "mov"]
//! default_threshold = 25.0
//! request_timeout_secs = 120
//! preview_strategy = "single_pass"
//!
//! [logging]
//! level = "debug"
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::configuration::{AnalysisOptions, PreviewOptions, PreviewStrategy, ScanOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Directory uploads are staged in while they are analysed.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Accepted file extensions, compared case-insensitively.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Threshold used when a request does not supply one.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Wall-clock bound for scanning plus rendering one upload.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub preview_strategy: PreviewStrategy,
    /// Optional bound on frames read per upload.
    #[serde(default)]
    pub max_frames: Option<u64>,
    /// Optional downscale for preview images.
    #[serde(default)]
    pub max_preview_dimension: Option<u32>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            upload_dir: default_upload_dir(),
            allowed_extensions: default_allowed_extensions(),
            default_threshold: default_threshold(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            preview_strategy: PreviewStrategy::default(),
            max_frames: None,
            max_preview_dimension: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_threshold.is_finite() && self.default_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default_threshold must be a finite, non-negative number (got {})",
                self.default_threshold
            )));
        }
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "allowed_extensions must not be empty".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Analysis settings for one request.
    pub fn analysis_options(&self, threshold: f64) -> AnalysisOptions {
        let mut scan = ScanOptions::new().with_threshold(threshold);
        if let Some(max_frames) = self.max_frames {
            scan = scan.with_max_frames(max_frames);
        }
        let mut preview = PreviewOptions::new();
        if let Some(max_dimension) = self.max_preview_dimension {
            preview = preview.with_max_dimension(max_dimension);
        }
        AnalysisOptions::new()
            .with_scan(scan)
            .with_preview(preview)
            .with_strategy(self.preview_strategy)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1:5000".into()
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_allowed_extensions() -> Vec<String> {
    ["mp4", "avi", "mov", "mkv"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_threshold() -> f64 {
    crate::configuration::DEFAULT_THRESHOLD
}
fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}
fn default_request_timeout_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".into()
}
