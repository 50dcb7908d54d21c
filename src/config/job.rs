//! Scrape job files
//!
//! A job bundles the URL to fetch with the scheme to apply, and may
//! override cache and html2text settings of the scraper running it:
//!
//! ```json
//! {
//!     "version": "1.0",
//!     "url": "https://example.com/",
//!     "timeout": 10,
//!     "cache_directory": "./cache",
//!     "cache_time": 3600,
//!     "html2text": { "width": 100, "table_borders": false },
//!     "scheme": { "title": { "tree": [{ "name": "title" }] } }
//! }
//! ```

use super::types::MarkdownConfig;
use super::validation::validate_markdown_config;
use crate::scheme::Scheme;
use crate::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Job format version understood by [`ScrapeJob::from_json`]
pub const JOB_VERSION: &str = "1.0";

/// Keys accepted in a job's `html2text` object
pub const HTML2TEXT_OPTIONS: &[&str] = &[
    "width",
    "max_wrap_width",
    "min_wrap_width",
    "pad_block_width",
    "raw_mode",
    "table_borders",
];

/// A loaded and compiled scrape job
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub url: String,
    pub scheme: Scheme,
    pub timeout: Option<Duration>,
    /// Replaces the configured cache directory
    pub cache_directory: Option<PathBuf>,
    /// Replaces the configured cache time-to-live
    pub cache_time: Option<Duration>,
    pub html2text: Option<Html2TextOptions>,
}

/// html2text settings from a job file; unset fields keep the configured value
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Html2TextOptions {
    pub width: Option<usize>,
    pub max_wrap_width: Option<usize>,
    pub min_wrap_width: Option<usize>,
    pub pad_block_width: Option<bool>,
    pub raw_mode: Option<bool>,
    pub table_borders: Option<bool>,
}

impl Html2TextOptions {
    /// Parses a job's `html2text` object, rejecting unknown options
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        if let serde_json::Value::Object(map) = &value {
            if let Some(key) = map.keys().find(|key| !HTML2TEXT_OPTIONS.contains(&key.as_str())) {
                return Err(ConfigError::UnknownHtml2TextOption(key.clone()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Overlays the set options onto `config`
    pub fn apply(&self, config: &mut MarkdownConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if self.max_wrap_width.is_some() {
            config.max_wrap_width = self.max_wrap_width;
        }
        if self.min_wrap_width.is_some() {
            config.min_wrap_width = self.min_wrap_width;
        }
        if let Some(pad) = self.pad_block_width {
            config.pad_block_width = pad;
        }
        if let Some(raw) = self.raw_mode {
            config.raw_mode = raw;
        }
        if let Some(borders) = self.table_borders {
            config.table_borders = borders;
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawJob {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    scheme: Option<serde_json::Value>,
    #[serde(default)]
    timeout: Option<f64>,
    #[serde(default)]
    cache_directory: Option<PathBuf>,
    #[serde(default)]
    cache_time: Option<f64>,
    #[serde(default)]
    html2text: Option<serde_json::Value>,
}

impl ScrapeJob {
    pub fn new(url: impl Into<String>, scheme: Scheme) -> Self {
        Self {
            url: url.into(),
            scheme,
            timeout: None,
            cache_directory: None,
            cache_time: None,
            html2text: None,
        }
    }

    /// Parses a job document and compiles its scheme
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawJob = serde_json::from_str(text)?;

        let scheme = match raw.scheme {
            Some(value) if !is_empty_value(&value) => value,
            _ => {
                return Err(ConfigError::Validation(
                    "Missing scheme definition".to_string(),
                ))
            }
        };
        let url = match raw.url {
            Some(url) if !url.is_empty() => url,
            _ => {
                return Err(ConfigError::Validation(
                    "Missing url definition".to_string(),
                ))
            }
        };
        if raw.version.as_deref() != Some(JOB_VERSION) {
            return Err(ConfigError::UnsupportedVersion(raw.version));
        }

        let timeout = match raw.timeout {
            None => None,
            Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(secs) => {
                return Err(ConfigError::Validation(format!(
                    "timeout must be a positive number of seconds, got {}",
                    secs
                )))
            }
        };

        if matches!(&raw.cache_directory, Some(dir) if dir.as_os_str().is_empty()) {
            return Err(ConfigError::Validation(
                "cache_directory cannot be empty".to_string(),
            ));
        }

        let cache_time = match raw.cache_time {
            None => None,
            Some(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(secs) => {
                return Err(ConfigError::Validation(format!(
                    "cache_time must be a non-negative number of seconds, got {}",
                    secs
                )))
            }
        };

        let html2text = match raw.html2text {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => {
                let options = Html2TextOptions::from_value(value)?;
                let mut effective = MarkdownConfig::default();
                options.apply(&mut effective);
                validate_markdown_config(&effective)?;
                Some(options)
            }
        };

        Ok(Self {
            url,
            scheme: Scheme::from_value(scheme)?,
            timeout,
            cache_directory: raw.cache_directory,
            cache_time,
            html2text,
        })
    }

    /// The cache time-to-live override as a chrono duration
    pub fn cache_ttl(&self) -> Option<chrono::Duration> {
        self.cache_time.map(|time| {
            chrono::Duration::from_std(time)
                .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1000))
        })
    }

    /// `base` with this job's html2text options applied
    pub fn markdown_config(&self, base: &MarkdownConfig) -> MarkdownConfig {
        let mut config = base.clone();
        if let Some(options) = &self.html2text {
            options.apply(&mut config);
        }
        config
    }
}

/// Loads a scrape job from a JSON file
///
/// # Arguments
///
/// * `path` - Path to the job file
///
/// # Returns
///
/// * `Ok(ScrapeJob)` - The job with its scheme compiled
/// * `Err(ConfigError)` - Unreadable file, bad JSON, missing url/scheme,
///   unsupported version, or an invalid scheme
pub fn load_job(path: &Path) -> Result<ScrapeJob, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    ScrapeJob::from_json(&content)
}

fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
