use crate::extract::Html2TextConverter;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default cache time-to-live in seconds (7 minutes)
pub const DEFAULT_CACHE_TIME: u64 = 7 * 60;

/// Default wrap width for HTML to text conversion
pub const DEFAULT_MARKDOWN_WIDTH: usize = 78;

/// Default number of redirects followed before giving up
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Main configuration structure for Scheme-Scrape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScraperConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub markdown: MarkdownConfig,
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cached bodies and the index; no directory disables caching
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Seconds a cached response is served without revalidation
    #[serde(default = "default_cache_time")]
    pub time: u64,

    /// Send If-Modified-Since / If-None-Match for cached URLs
    #[serde(rename = "use-advanced", default = "default_true")]
    pub use_advanced: bool,
}

impl CacheConfig {
    /// Time-to-live, capped at the largest duration chrono can represent
    pub fn ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.time).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs.min(i64::MAX / 1000))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            time: DEFAULT_CACHE_TIME,
            use_advanced: true,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Follow redirects
    #[serde(rename = "handle-redirect", default = "default_true")]
    pub handle_redirect: bool,

    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpConfig {
    /// The configured timeout, if any
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            handle_redirect: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: default_user_agent(),
        }
    }
}

/// HTML to text conversion settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkdownConfig {
    #[serde(default = "default_markdown_width")]
    pub width: usize,

    /// Wrap paragraphs at this width even when more room is available
    #[serde(rename = "max-wrap-width", default)]
    pub max_wrap_width: Option<usize>,

    #[serde(rename = "min-wrap-width", default)]
    pub min_wrap_width: Option<usize>,

    #[serde(rename = "pad-block-width", default)]
    pub pad_block_width: bool,

    /// Render table cells one after another
    #[serde(rename = "raw-mode", default)]
    pub raw_mode: bool,

    #[serde(rename = "table-borders", default = "default_true")]
    pub table_borders: bool,
}

impl MarkdownConfig {
    /// Builds the converter these settings describe
    pub fn converter(&self) -> Html2TextConverter {
        Html2TextConverter::new(self.width)
            .with_max_wrap_width(self.max_wrap_width)
            .with_min_wrap_width(self.min_wrap_width)
            .with_pad_block_width(self.pad_block_width)
            .with_raw_mode(self.raw_mode)
            .with_table_borders(self.table_borders)
    }
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_MARKDOWN_WIDTH,
            max_wrap_width: None,
            min_wrap_width: None,
            pad_block_width: false,
            raw_mode: false,
            table_borders: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_time() -> u64 {
    DEFAULT_CACHE_TIME
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

fn default_markdown_width() -> usize {
    DEFAULT_MARKDOWN_WIDTH
}

fn default_user_agent() -> String {
    format!("scheme-scrape/{}", env!("CARGO_PKG_VERSION"))
}
