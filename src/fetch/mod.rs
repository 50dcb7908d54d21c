//! Fetch capability used by the scraper
//!
//! This module defines:
//! - The [`Fetcher`] trait the scraper fetches through
//! - Request/response types carrying exactly what the cache protocol needs
//!   (status, headers, final URL, redirect history, body text)
//! - Error classification separating transport failures from HTTP-status
//!   errors and unknown failures
//! - [`HttpFetcher`], the `reqwest`-backed implementation

mod http;

pub use http::{build_http_client, HttpFetcher};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ETAG};
use reqwest::{Method, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timeout loading {url}")]
    Timeout { url: String },

    #[error("Failed to load {url}: {message}")]
    Connect { url: String, message: String },

    #[error("TLS failure loading {url}: {message}")]
    Tls { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("Unable to read response from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Unknown failure loading {url}: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    /// Transport-level failure (timeout, refused connection, TLS)
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout { .. } | FetchError::Connect { .. } | FetchError::Tls { .. }
        )
    }

    /// The server answered with an error status
    pub fn is_status(&self) -> bool {
        matches!(self, FetchError::Status { .. })
    }
}

/// A single HTTP request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    /// `None` leaves the client's own timeout in effect
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    /// Query parameters appended to the URL
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            timeout: None,
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        let mut request = Self::new(Method::POST, url);
        request.body = Some(body.into());
        request
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header presence check
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Value of the first header called `name`
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One redirect followed while fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    pub status: StatusCode,
    pub from: String,
    pub to: String,
}

/// Response to a fetch
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// URL of the final response after redirects
    pub final_url: String,
    /// Redirects followed, oldest first
    pub history: Vec<RedirectHop>,
    pub text: String,
}

impl FetchResponse {
    /// A plain response without redirects, mostly useful for custom fetchers
    pub fn new(status: StatusCode, final_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            final_url: final_url.into(),
            history: Vec::new(),
            text: text.into(),
        }
    }

    /// The `ETag` response header
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|value| value.to_str().ok())
    }
}

/// Performs HTTP requests for the scraper
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

impl fmt::Debug for dyn Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fetcher")
    }
}
