//! Watcher configuration.
//!
//! Read from a TOML file. Secrets and the zone source may instead come from
//! the environment (`TEXTBELT_API_KEY`, `GEOFENCES_URL`) when the file leaves
//! them out.
//!
//! ```toml
//! geofences_url = "https://docs.google.com/spreadsheets/d/.../export?format=csv"
//! reports_path = "reports.json"
//! phone_numbers = ["15555550100"]
//! source_timeout_secs = 30
//! source_max_retries = 3
//! redact_logs = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use geowatch_alert::notify::DEFAULT_TEXTBELT_URL;
use geowatch_zone::ZoneStoreConfig;
use serde::Deserialize;

/// Config file read when no path is given. It may be absent, in which case
/// every setting comes from defaults and the environment.
pub const DEFAULT_CONFIG_PATH: &str = "geowatch.toml";

/// Environment variable consulted when `geofences_url` is not configured.
pub const GEOFENCES_URL_ENV: &str = "GEOFENCES_URL";
/// Environment variable consulted when `textbelt_api_key` is not configured.
pub const TEXTBELT_API_KEY_ENV: &str = "TEXTBELT_API_KEY";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required setting is absent from both the file and the environment.
    #[error("Missing required setting '{field}' (set it in the config file or {env})")]
    Missing {
        /// Config key.
        field: &'static str,
        /// Environment fallback.
        env: &'static str,
    },
}

/// On-disk layout; optional where the environment can fill in.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    geofences_url: Option<String>,
    #[serde(default = "default_reports_path")]
    reports_path: PathBuf,
    #[serde(default)]
    phone_numbers: Vec<String>,
    textbelt_api_key: Option<String>,
    #[serde(default = "default_textbelt_url")]
    textbelt_url: String,
    #[serde(default = "default_source_timeout_secs")]
    source_timeout_secs: u64,
    #[serde(default = "default_source_max_retries")]
    source_max_retries: u32,
    #[serde(default)]
    redact_logs: bool,
}

fn default_reports_path() -> PathBuf {
    PathBuf::from("reports.json")
}

fn default_textbelt_url() -> String {
    DEFAULT_TEXTBELT_URL.to_string()
}

const fn default_source_timeout_secs() -> u64 {
    30
}

const fn default_source_max_retries() -> u32 {
    3
}

/// Resolved watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Zone table location.
    pub geofences_url: String,
    /// JSON dump of location reports written by the report fetcher.
    pub reports_path: PathBuf,
    /// Alert recipients.
    pub phone_numbers: Vec<String>,
    /// Textbelt API key; only needed when alerts are actually sent.
    pub textbelt_api_key: Option<String>,
    /// Textbelt endpoint.
    pub textbelt_url: String,
    /// Upper bound on one zone source fetch.
    pub source_timeout: Duration,
    /// Retries for transient zone source failures.
    pub source_max_retries: u32,
    /// Whether log output should be redacted.
    pub redact_logs: bool,
}

impl Config {
    /// Reads and resolves the config file against the process environment.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// read if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// required setting is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, Path::new(DEFAULT_CONFIG_PATH), |key| {
            std::env::var(key).ok()
        })
    }

    fn load_with(
        path: Option<&Path>,
        default_path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let text = match path {
            Some(path) => read(path)?,
            None => match std::fs::read_to_string(default_path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!(
                        "No {} found; using environment only",
                        default_path.display()
                    );
                    String::new()
                }
                Err(source) => {
                    return Err(ConfigError::Io {
                        path: default_path.to_path_buf(),
                        source,
                    });
                }
            },
        };
        Self::parse(&text, env)
    }

    /// Parses config text, using `env` to look up fallbacks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is invalid or a required setting
    /// is missing.
    pub fn parse(text: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;

        let geofences_url = file
            .geofences_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| env(GEOFENCES_URL_ENV))
            .ok_or(ConfigError::Missing {
                field: "geofences_url",
                env: GEOFENCES_URL_ENV,
            })?;

        Ok(Self {
            geofences_url,
            reports_path: file.reports_path,
            phone_numbers: file.phone_numbers,
            textbelt_api_key: file
                .textbelt_api_key
                .or_else(|| env(TEXTBELT_API_KEY_ENV)),
            textbelt_url: file.textbelt_url,
            source_timeout: Duration::from_secs(file.source_timeout_secs),
            source_max_retries: file.source_max_retries,
            redact_logs: file.redact_logs,
        })
    }

    /// Zone store settings derived from this config.
    #[must_use]
    pub fn zone_store_config(&self) -> ZoneStoreConfig {
        ZoneStoreConfig {
            source_url: self.geofences_url.clone(),
            timeout: self.source_timeout,
            max_retries: self.source_max_retries,
        }
    }

    /// The Textbelt API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no key is configured.
    pub fn require_textbelt_api_key(&self) -> Result<&str, ConfigError> {
        self.textbelt_api_key
            .as_deref()
            .ok_or(ConfigError::Missing {
                field: "textbelt_api_key",
                env: TEXTBELT_API_KEY_ENV,
            })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
