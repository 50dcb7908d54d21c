//! Scrape orchestration
//!
//! This module provides [`WebScraper`], which fetches documents through the
//! response cache and evaluates extraction schemes against them, and
//! [`run_job`] as the one-call entry point used by the binary.

mod client;

pub use client::WebScraper;

use crate::config::{ScrapeJob, ScraperConfig};
use crate::Result;
use serde_json::Value;

/// Runs a scrape job with the given configuration
///
/// # Arguments
///
/// * `config` - Scraper configuration
/// * `job` - The job to run
/// * `shrink` - Whether to shrink the result
///
/// # Returns
///
/// * `Ok(Value)` - The extraction result
/// * `Err(ScrapeError)` - The scraper could not be built or the fetch failed
pub async fn run_job(config: &ScraperConfig, job: ScrapeJob, shrink: bool) -> Result<Value> {
    tracing::info!("Scraping {}", job.url);
    let scraper = WebScraper::new(config)?.with_job(job);

    if shrink {
        scraper.scrape_shrunk(None, None, None).await
    } else {
        let result = scraper.scrape(None, None, None).await?;
        Ok(Value::Object(result))
    }
}
