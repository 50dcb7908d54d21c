//! The cached web scraper
//!
//! [`WebScraper`] ties together the response cache, a [`Fetcher`] and the
//! extraction engine:
//!
//! 1. Serve fresh cached bodies without touching the network
//! 2. Revalidate stale entries with `If-Modified-Since` / `If-None-Match`
//! 3. Store successful responses under the requested and the final URL
//! 4. Parse the body and evaluate the scheme against it

use crate::cache::{CacheIndex, ResponseCache};
use crate::config::{MarkdownConfig, ScrapeJob, ScraperConfig};
use crate::extract::{extract_document, shrink_owned, MarkdownConverter};
use crate::fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher};
use crate::scheme::Scheme;
use crate::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
const IF_NONE_MATCH: &str = "If-None-Match";

/// Fetches pages through a response cache and extracts data from them
#[derive(Debug, Clone)]
pub struct WebScraper {
    cache: ResponseCache,
    fetcher: Arc<dyn Fetcher>,
    converter: Arc<dyn MarkdownConverter>,
    markdown: MarkdownConfig,
    use_advanced: bool,
    job: Option<ScrapeJob>,
}

impl WebScraper {
    /// Creates a scraper fetching over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - Cache, HTTP and markdown settings
    ///
    /// # Returns
    ///
    /// * `Ok(WebScraper)` - Ready to use scraper
    /// * `Err(ScrapeError)` - The HTTP client could not be built
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Creates a scraper that fetches through `fetcher`
    pub fn with_fetcher(config: &ScraperConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cache: ResponseCache::new(config.cache.directory.clone(), config.cache.ttl()),
            fetcher,
            converter: Arc::new(config.markdown.converter()),
            markdown: config.markdown.clone(),
            use_advanced: config.cache.use_advanced,
            job: None,
        }
    }

    /// Uses `index` instead of the process-wide cache index
    pub fn with_cache_index(mut self, index: CacheIndex) -> Self {
        self.cache = self.cache.with_index(index);
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn MarkdownConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Sets the url, scheme and timeout used when [`scrape`](Self::scrape)
    /// is called without them
    ///
    /// The job's `cache_directory` and `cache_time` replace the configured
    /// cache settings. Its `html2text` options are applied on top of the
    /// `[markdown]` section and replace any converter set earlier.
    pub fn with_job(mut self, job: ScrapeJob) -> Self {
        if let Some(directory) = &job.cache_directory {
            tracing::debug!("Job caches into {}", directory.display());
            self.cache = self.cache.with_directory(Some(directory.clone()));
        }
        if let Some(ttl) = job.cache_ttl() {
            self.cache = self.cache.with_ttl(ttl);
        }
        if job.html2text.is_some() {
            self.markdown = job.markdown_config(&self.markdown);
            self.converter = Arc::new(self.markdown.converter());
        }
        self.job = Some(job);
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn job(&self) -> Option<&ScrapeJob> {
        self.job.as_ref()
    }

    /// Fetches a document, going through the cache
    ///
    /// Conditional headers are only added when the caller did not set them
    /// and `use-advanced` is enabled.
    ///
    /// With `handle-redirect = false` a 3xx response is not followed. It is
    /// reported as `FetchError::Status` and nothing is cached, rather than
    /// its body being returned.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The document body, cached or fresh
    /// * `Err(ScrapeError::Fetch)` - Transport failure or non-success status
    pub async fn get(&self, request: FetchRequest) -> Result<String> {
        let url = request.url.clone();
        let cached = self.cache.get(&url);
        if let Some(body) = cached.body {
            return Ok(body);
        }

        let mut conditional = request.clone();
        if self.use_advanced {
            if let Some(access_time) = cached.access_time {
                if !conditional.has_header(IF_MODIFIED_SINCE) {
                    conditional = conditional.header(IF_MODIFIED_SINCE, http_date(access_time));
                }
            }
            if let Some(etag) = &cached.etag {
                if !conditional.has_header(IF_NONE_MATCH) {
                    conditional = conditional.header(IF_NONE_MATCH, etag.as_str());
                }
            }
        }

        let response = self.fetcher.fetch(conditional).await?;
        log_redirects(&response);

        if response.status == StatusCode::NOT_MODIFIED {
            tracing::info!("Not modified {}", url);
            let etag = response.etag().map(str::to_string).or(cached.etag);
            let revalidated = self.cache.get_with(&url, true);
            self.cache.update(&url, None, etag.as_deref());

            if let Some(body) = revalidated.body {
                return Ok(body);
            }

            tracing::warn!("Cached body of {} is gone, fetching again", url);
            let response = self.fetcher.fetch(request).await?;
            log_redirects(&response);
            return self.accept(&url, response);
        }

        self.accept(&url, response)
    }

    /// Fetches `url` and applies `scheme` to it
    ///
    /// Missing arguments fall back to the configured job.
    ///
    /// # Returns
    ///
    /// * `Ok(Map)` - The raw extraction result
    /// * `Err(ScrapeError::MissingScheme)` / `Err(ScrapeError::MissingUrl)` -
    ///   Neither an argument nor the job provides it
    /// * `Err(ScrapeError::Fetch)` - The document could not be fetched
    pub async fn scrape(
        &self,
        url: Option<&str>,
        scheme: Option<&Scheme>,
        timeout: Option<Duration>,
    ) -> Result<Map<String, Value>> {
        let scheme = scheme
            .or_else(|| self.job.as_ref().map(|job| &job.scheme))
            .filter(|scheme| !scheme.is_empty())
            .ok_or(ScrapeError::MissingScheme)?;
        let url = url
            .or_else(|| self.job.as_ref().map(|job| job.url.as_str()))
            .filter(|url| !url.is_empty())
            .ok_or(ScrapeError::MissingUrl)?;
        let timeout = timeout.or_else(|| self.job.as_ref().and_then(|job| job.timeout));

        let html = self.get(FetchRequest::get(url).with_timeout(timeout)).await?;
        Ok(extract_document(&html, scheme, self.converter.as_ref()))
    }

    /// Like [`scrape`](Self::scrape), with the result shrunk
    pub async fn scrape_shrunk(
        &self,
        url: Option<&str>,
        scheme: Option<&Scheme>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let result = self.scrape(url, scheme, timeout).await?;
        Ok(shrink_owned(Value::Object(result)))
    }

    /// Checks the status and stores a fresh response
    fn accept(&self, url: &str, response: FetchResponse) -> Result<String> {
        if response.status == StatusCode::NOT_MODIFIED {
            return Err(ScrapeError::NotModifiedWithoutBody {
                url: url.to_string(),
            });
        }
        if !response.status.is_success() {
            return Err(FetchError::Status {
                url: response.final_url,
                status: response.status,
            }
            .into());
        }

        let etag = response.etag();
        self.cache.put(url, &response.text, etag);

        if !same_url(url, &response.final_url) {
            if response.history.is_empty() {
                tracing::warn!(
                    "Response url {} differs from {} without redirects",
                    response.final_url,
                    url
                );
            }
            self.cache.put(&response.final_url, &response.text, etag);
        }

        Ok(response.text)
    }
}

/// Logs every redirect followed by a fetch
fn log_redirects(response: &FetchResponse) {
    for hop in &response.history {
        match hop.status.as_u16() {
            302 | 303 | 307 => tracing::info!("Temporary redirect to {}", hop.to),
            301 | 308 => tracing::warn!("Moved to {}", hop.to),
            code => tracing::error!("Unknown redirect code {} to {}", code, hop.to),
        }
    }
}

/// RFC 1123 date as used by `If-Modified-Since`
fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Compares URLs after normalization, falling back to plain string equality
fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
