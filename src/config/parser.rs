use crate::config::types::ScraperConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads a scraper configuration from a TOML file
///
/// The `[cache]`, `[http]` and `[markdown]` sections are all optional;
/// whatever is missing takes its default. The result is validated before
/// it is returned.
///
/// # Errors
///
/// `ConfigError::Io` when the file cannot be read, `ConfigError::Parse`
/// for bad TOML or mistyped keys, `ConfigError::Validation` for values out
/// of range.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use scheme_scrape::config::load_config;
///
/// let config = load_config(Path::new("scrape.toml")).unwrap();
/// println!("Cache time: {}s", config.cache.time);
/// ```
pub fn load_config(path: &Path) -> Result<ScraperConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<ScraperConfig, ConfigError> {
    let config: ScraperConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Fingerprint of a scraper configuration file
///
/// Hex SHA-256 of the raw file bytes. The binary logs it when the
/// configuration is loaded, so two runs that scraped with different cache
/// or html2text settings can be told apart in the logs. Formatting changes alter it
/// too; it identifies the file, not the parsed settings.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(fingerprint(&content))
}

/// [`load_config`] and [`compute_config_hash`] over a single read of `path`
///
/// The fingerprint always matches the text the configuration was parsed
/// from, even if the file is rewritten while the scraper starts.
pub fn load_config_with_hash(path: &Path) -> Result<(ScraperConfig, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, fingerprint(content.as_bytes())))
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
