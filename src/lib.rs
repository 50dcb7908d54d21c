//! Scheme-Scrape: declarative HTML extraction over a cached fetcher
//!
//! This crate fetches HTML pages through a file-backed response cache with
//! conditional revalidation, then applies a JSON extraction scheme to the
//! parsed document to produce a nested result.

pub mod cache;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod scheme;
pub mod scrape;

use thiserror::Error;

/// Main error type for Scheme-Scrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheme error: {0}")]
    Scheme(#[from] SchemeError),

    #[error(transparent)]
    Fetch(#[from] fetch::FetchError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Missing url definition")]
    MissingUrl,

    #[error("Missing scheme definition")]
    MissingScheme,

    #[error("Server reported {url} as not modified but no cached body is available")]
    NotModifiedWithoutBody { url: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse job file: {0}")]
    Job(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported job version: {0:?}")]
    UnsupportedVersion(Option<String>),

    #[error("Setting html2text failed - unknown parameter {0}")]
    UnknownHtml2TextOption(String),

    #[error("Invalid scheme in job file: {0}")]
    Scheme(#[from] SchemeError),
}

/// Errors raised while compiling an extraction scheme
///
/// These indicate a mistake in the scheme document itself, so they are
/// reported immediately instead of being downgraded to "no match".
#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("Malformed scheme document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Field '{field}': attribute-type value requires an 'attribute' name")]
    MissingAttribute { field: String },

    #[error("Field '{field}': invalid regular expression: {source}")]
    InvalidRegex {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("Field '{field}': unknown pattern type '{kind}'")]
    UnknownPatternType { field: String, kind: String },

    #[error("Field '{field}': {message}")]
    Invalid { field: String, message: String },
}

/// Result type alias for Scheme-Scrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for scheme compilation
pub type SchemeResult<T> = std::result::Result<T, SchemeError>;

// Re-export commonly used types
pub use cache::{CacheIndex, CacheLookup, ResponseCache};
pub use config::{ScrapeJob, ScraperConfig};
pub use extract::{evaluate, match_tree, shrink, Node};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use scheme::Scheme;
pub use scrape::WebScraper;
