//! Runtime configuration.
//!
//! Every section has complete defaults, so an empty file (or no file) is a
//! valid configuration. Files are TOML or JSON, picked by extension.
//!
//! ```toml
//! [transport]
//! base_url = "https://console.example/"
//! method = "post"
//! csrf_token = "abc"
//!
//! [timing]
//! min_poll_interval_ms = 1000
//! resize_debounce_ms = 100
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Duration;

use crate::transport::Method;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {path} (expected .toml or .json)")]
    UnknownFormat { path: PathBuf },

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub transport: TransportConfig,
    pub regions: RegionConfig,
    pub timing: TimingConfig,
    pub bus: BusConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Render paths are resolved against this URL.
    pub base_url: String,
    pub method: Method,
    /// Sent as `X-CSRFToken` on every same-origin call.
    pub csrf_token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".into(),
            method: Method::Post,
            csrf_token: None,
            timeout_ms: 30_000,
        }
    }
}

/// Ids of the fixed regions every console page carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Transport failures of layout and update calls land here.
    pub error: String,
    pub content: String,
    /// Renderer navigation lays out into `content`.
    pub content_renderer: String,
    pub main: String,
    pub navigator: String,
    pub footer: String,
    pub footer_message: String,
    pub backtrace: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            error: "error_action".into(),
            content: "content".into(),
            content_renderer: "ContentView".into(),
            main: "main".into(),
            navigator: "navigator".into(),
            footer: "footer".into(),
            footer_message: "footer_message".into(),
            backtrace: "backtrace".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Poll intervals below this are raised to it.
    pub min_poll_interval_ms: u64,
    pub resize_debounce_ms: u64,
    /// Upper bound on tasks `run_until_idle` executes before giving up.
    pub max_loop_steps: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_poll_interval_ms: 1000,
            resize_debounce_ms: 100,
            max_loop_steps: 100_000,
        }
    }
}

impl TimingConfig {
    pub fn min_poll_interval(&self) -> Duration {
        Duration::from_millis(self.min_poll_interval_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Retire handlers whose region left the page, in addition to dropped
    /// guards.
    pub prune_by_region: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            prune_by_region: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from `path`, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("json") => Self::from_json_str,
            _ => {
                return Err(ConfigError::UnknownFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse(&content)
    }

    /// Load and reject configurations with validation problems.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?;
        let problems = config.validate();
        if problems.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    /// Every problem found. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.transport.base_url.trim().is_empty() {
            errors.push("transport.base_url must not be empty".into());
        } else if !self.transport.base_url.ends_with('/') {
            errors.push(format!(
                "transport.base_url must end with '/', got {:?}",
                self.transport.base_url
            ));
        }
        if self.transport.timeout_ms == 0 {
            errors.push("transport.timeout_ms must be > 0".into());
        }

        let regions = [
            ("regions.error", &self.regions.error),
            ("regions.content", &self.regions.content),
            ("regions.content_renderer", &self.regions.content_renderer),
            ("regions.main", &self.regions.main),
            ("regions.navigator", &self.regions.navigator),
            ("regions.footer", &self.regions.footer),
            ("regions.footer_message", &self.regions.footer_message),
            ("regions.backtrace", &self.regions.backtrace),
        ];
        for (name, value) in regions {
            if value.trim().is_empty() {
                errors.push(format!("{name} must not be empty"));
            }
        }
        let fixed = [
            &self.regions.error,
            &self.regions.content,
            &self.regions.footer,
            &self.regions.footer_message,
            &self.regions.backtrace,
        ];
        for (i, a) in fixed.iter().enumerate() {
            if fixed[i + 1..].contains(a) {
                errors.push(format!("region id {a:?} is used twice"));
            }
        }

        if self.timing.min_poll_interval_ms == 0 {
            errors.push("timing.min_poll_interval_ms must be > 0".into());
        }
        if self.timing.max_loop_steps == 0 {
            errors.push("timing.max_loop_steps must be > 0".into());
        }

        errors
    }
}
