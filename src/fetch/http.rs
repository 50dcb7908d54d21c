//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building HTTP clients with the configured user agent
//! - Manual redirect handling so the redirect history is visible
//! - Error classification

use super::{FetchError, FetchRequest, FetchResponse, Fetcher, RedirectHop};
use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{redirect::Policy, Client, Method, StatusCode};
use std::error::Error as StdError;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use scheme_scrape::config::HttpConfig;
/// use scheme_scrape::fetch::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true);

    if let Some(timeout) = config.timeout_duration() {
        builder = builder.timeout(timeout);
    }

    builder.build()
}

/// `reqwest`-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    handle_redirect: bool,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, config))
    }

    /// Wraps an existing client; redirect settings still come from `config`
    pub fn with_client(client: Client, config: &HttpConfig) -> Self {
        Self {
            client,
            handle_redirect: config.handle_redirect,
            max_redirects: config.max_redirects,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Sends the request, following redirects when enabled
    ///
    /// # Redirects
    ///
    /// | Status | Action |
    /// |--------|--------|
    /// | 301, 302 | Follow; POST becomes GET |
    /// | 303 | Follow as GET |
    /// | 307, 308 | Follow with same method and body |
    /// | 304 | Returned as-is (not a redirect) |
    ///
    /// More than `max_redirects` hops is an error.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut url = Url::parse(&request.url).map_err(|e| FetchError::InvalidUrl {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(request.params.iter());
        }

        let mut method = request.method.clone();
        let mut body = request.body.clone();
        let mut history = Vec::new();

        loop {
            let mut builder = self.client.request(method.clone(), url.clone());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(|e| classify_error(url.as_str(), &e))?;
            let status = response.status();

            if self.handle_redirect && status.is_redirection() && status != StatusCode::NOT_MODIFIED {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok());

                if let Some(location) = location {
                    if history.len() >= self.max_redirects {
                        return Err(FetchError::RedirectLimit {
                            url: request.url.clone(),
                        });
                    }

                    let next = url.join(location).map_err(|e| FetchError::InvalidUrl {
                        url: location.to_string(),
                        message: e.to_string(),
                    })?;
                    tracing::trace!("Redirect {} {} -> {}", status.as_u16(), url, next);

                    history.push(RedirectHop {
                        status,
                        from: url.to_string(),
                        to: next.to_string(),
                    });

                    let downgrade = status == StatusCode::SEE_OTHER
                        || (method == Method::POST
                            && (status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND));
                    if downgrade {
                        method = Method::GET;
                        body = None;
                    }

                    url = next;
                    continue;
                }
            }

            let headers = response.headers().clone();
            let final_url = response.url().to_string();
            let text = response.text().await.map_err(|e| FetchError::Body {
                url: final_url.clone(),
                message: e.to_string(),
            })?;

            tracing::debug!(
                "fetched {} -> {} ({}, {} bytes)",
                request.url,
                final_url,
                status.as_u16(),
                text.len()
            );

            return Ok(FetchResponse {
                status,
                headers,
                final_url,
                history,
                text,
            });
        }
    }
}

/// Maps a transport error onto the fetch error taxonomy
fn classify_error(url: &str, error: &reqwest::Error) -> FetchError {
    let message = error_chain(error);

    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if is_tls_message(&message) {
        FetchError::Tls {
            url: url.to_string(),
            message,
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message,
        }
    } else {
        tracing::error!("Failed to load {}: {}", url, message);
        FetchError::Other {
            url: url.to_string(),
            message,
        }
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_tls_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        assert!(fetcher.handle_redirect);
        assert_eq!(fetcher.max_redirects, 10);
    }

    #[test]
    fn test_is_tls_message() {
        assert!(is_tls_message("invalid peer certificate: UnknownIssuer"));
        assert!(is_tls_message("received fatal alert from TLS peer"));
        assert!(!is_tls_message("connection refused"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let err = fetcher.fetch(FetchRequest::get("not a url")).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connectivity() {
        // port 9 (discard) is closed on any sane test host
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let err = fetcher
            .fetch(FetchRequest::get("http://127.0.0.1:9/"))
            .await
            .unwrap_err();
        assert!(err.is_connectivity(), "unexpected error: {:?}", err);
    }
}
