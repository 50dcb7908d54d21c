//! Configuration module for Scheme-Scrape
//!
//! This module handles loading, parsing, and validating the TOML scraper
//! configuration, and loading JSON scrape job files.
//!
//! # Example
//!
//! ```no_run
//! use scheme_scrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scrape.toml")).unwrap();
//! println!("Responses are cached for {}s", config.cache.time);
//! ```

mod job;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, HttpConfig, MarkdownConfig, ScraperConfig, DEFAULT_CACHE_TIME,
    DEFAULT_MARKDOWN_WIDTH, DEFAULT_MAX_REDIRECTS,
};

// Re-export loader functions
pub use job::{load_job, Html2TextOptions, ScrapeJob, HTML2TEXT_OPTIONS, JOB_VERSION};
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
