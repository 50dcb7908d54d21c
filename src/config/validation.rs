use crate::config::types::{CacheConfig, HttpConfig, MarkdownConfig, ScraperConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &ScraperConfig) -> Result<(), ConfigError> {
    validate_cache_config(&config.cache)?;
    validate_http_config(&config.http)?;
    validate_markdown_config(&config.markdown)?;
    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if let Some(directory) = &config.directory {
        if directory.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "cache directory cannot be empty".to_string(),
            ));
        }
    }

    // time = 0 is allowed: every cached entry is revalidated
    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if let Some(timeout) = config.timeout {
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "timeout must be a positive number of seconds, got {}",
                timeout
            )));
        }
    }

    if config.max_redirects < 1 || config.max_redirects > 50 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be between 1 and 50, got {}",
            config.max_redirects
        )));
    }

    validate_user_agent(&config.user_agent)?;

    Ok(())
}

/// Validates the user agent header value
fn validate_user_agent(user_agent: &str) -> Result<(), ConfigError> {
    if user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "user_agent must not contain control characters, got {:?}",
            user_agent
        )));
    }

    Ok(())
}

/// Validates html to text settings
pub(super) fn validate_markdown_config(config: &MarkdownConfig) -> Result<(), ConfigError> {
    if config.width < 20 {
        return Err(ConfigError::Validation(format!(
            "markdown width must be >= 20, got {}",
            config.width
        )));
    }

    if let Some(max) = config.max_wrap_width {
        if max == 0 {
            return Err(ConfigError::Validation(
                "max_wrap_width must be >= 1".to_string(),
            ));
        }
    }

    if let (Some(min), Some(max)) = (config.min_wrap_width, config.max_wrap_width) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "min_wrap_width ({}) must not exceed max_wrap_width ({})",
                min, max
            )));
        }
    }

    Ok(())
}
