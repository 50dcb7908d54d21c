//! Integration tests for the scraper
//!
//! These tests use wiremock to create mock HTTP servers and test
//! fetching, caching, revalidation and extraction end-to-end.

use reqwest::StatusCode;
use scheme_scrape::cache::CacheIndex;
use scheme_scrape::config::{ScrapeJob, ScraperConfig};
use scheme_scrape::fetch::{FetchError, FetchRequest, Fetcher, HttpFetcher};
use scheme_scrape::scheme::Scheme;
use scheme_scrape::{ScrapeError, WebScraper};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<html>
<head><title>Catalog</title></head>
<body>
  <ul id="items">
    <li class="item"><a href="/a">Alpha</a></li>
    <li class="item"><a href="/b">Beta</a></li>
  </ul>
</body>
</html>"#;

/// Creates a test configuration caching into `cache_dir`
fn create_test_config(cache_dir: &TempDir) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.cache.directory = Some(cache_dir.path().to_path_buf());
    config.http.user_agent = "TestScraper/1.0".to_string();
    config
}

fn create_scraper(config: &ScraperConfig) -> WebScraper {
    WebScraper::new(config)
        .expect("Failed to build scraper")
        .with_cache_index(CacheIndex::new())
}

fn links_scheme() -> Scheme {
    Scheme::from_json(
        r#"{
            "title": {"tree": [{"name": "title"}], "value": {"type": "text"}},
            "links": {
                "tree": [{"name": "ul", "id": "items"}, {"name": "a"}],
                "children": {
                    "href": {"value": {"type": "attribute", "attribute": "href"}},
                    "name": {"value": {"type": "text"}}
                }
            }
        }"#,
    )
    .expect("Failed to compile scheme")
}

#[tokio::test]
async fn test_scrape_end_to_end() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/catalog", mock_server.uri());
    let scraper = create_scraper(&create_test_config(&cache_dir));
    let scheme = links_scheme();

    let result = scraper
        .scrape_shrunk(Some(&url), Some(&scheme), None)
        .await
        .expect("Scrape failed");

    assert_eq!(
        result,
        json!({
            "title": "Catalog",
            "links": [
                {"href": "/a", "name": "Alpha"},
                {"href": "/b", "name": "Beta"}
            ]
        })
    );
}

#[tokio::test]
async fn test_second_scrape_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/catalog", mock_server.uri());
    let job = ScrapeJob::new(url.clone(), links_scheme());
    let scraper = create_scraper(&create_test_config(&cache_dir)).with_job(job);

    let first = scraper.scrape(None, None, None).await.unwrap();
    let second = scraper.scrape(None, None, None).await.unwrap();
    assert_eq!(first, second);

    // Body and index were persisted
    assert!(cache_dir.path().join("cache_index.tmp").exists());
    assert!(scraper.cache().get(&url).is_hit());
}

#[tokio::test]
async fn test_cache_survives_new_scraper() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/catalog", mock_server.uri());
    let config = create_test_config(&cache_dir);

    let body = create_scraper(&config)
        .get(FetchRequest::get(url.clone()))
        .await
        .unwrap();

    // A fresh index has to load the index file from disk
    let reloaded = create_scraper(&config)
        .get(FetchRequest::get(url))
        .await
        .unwrap();
    assert_eq!(body, reloaded);
}

#[tokio::test]
async fn test_etag_revalidation() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    // Mounted first so it wins for conditional requests
    Mock::given(method("GET"))
        .and(path("/doc"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_string("<p>original</p>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/doc", mock_server.uri());
    let scraper = create_scraper(&create_test_config(&cache_dir));

    let first = scraper.get(FetchRequest::get(url.clone())).await.unwrap();
    assert_eq!(first, "<p>original</p>");
    assert_eq!(scraper.cache().get(&url).etag.as_deref(), Some("\"v1\""));

    // Age the entry past its time-to-live
    let old = chrono::Utc::now() - chrono::Duration::hours(1);
    scraper.cache().update(&url, Some(old), Some("\"v1\""));
    assert!(scraper.cache().get(&url).is_stale());

    let second = scraper.get(FetchRequest::get(url.clone())).await.unwrap();
    assert_eq!(second, "<p>original</p>");

    let lookup = scraper.cache().get(&url);
    assert!(lookup.is_hit());
    assert!(lookup.access_time.unwrap() > old);
}

#[tokio::test]
async fn test_redirect_history_and_final_url() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .mount(&mock_server)
        .await;

    let old_url = format!("{}/old", mock_server.uri());
    let new_url = format!("{}/new", mock_server.uri());
    let config = create_test_config(&cache_dir);

    let fetcher = HttpFetcher::new(&config.http).unwrap();
    let response = fetcher.fetch(FetchRequest::get(old_url.clone())).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.final_url, new_url);
    assert_eq!(response.history.len(), 1);
    assert_eq!(response.history[0].status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.history[0].to, new_url);

    let scraper = create_scraper(&config);
    let body = scraper.get(FetchRequest::get(old_url.clone())).await.unwrap();
    assert_eq!(body, "moved here");
    assert_eq!(scraper.cache().get(&old_url).body.as_deref(), Some("moved here"));
    assert_eq!(scraper.cache().get(&new_url).body.as_deref(), Some("moved here"));
}

#[tokio::test]
async fn test_redirect_loop_hits_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&mock_server)
        .await;

    let mut config = ScraperConfig::default();
    config.http.max_redirects = 3;
    let fetcher = HttpFetcher::new(&config.http).unwrap();

    let err = fetcher
        .fetch(FetchRequest::get(format!("{}/loop", mock_server.uri())))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::RedirectLimit { .. }));
}

#[tokio::test]
async fn test_unfollowed_redirect_is_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;

    let mut config = ScraperConfig::default();
    config.http.handle_redirect = false;
    let scraper = create_scraper(&config);

    let err = scraper
        .get(FetchRequest::get(format!("{}/old", mock_server.uri())))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScrapeError::Fetch(FetchError::Status { status, .. }) if status == StatusCode::FOUND
    ));
}

#[tokio::test]
async fn test_error_status() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    let scraper = create_scraper(&create_test_config(&cache_dir));

    let err = scraper.get(FetchRequest::get(url.clone())).await.unwrap_err();
    match err {
        ScrapeError::Fetch(e) => {
            assert!(e.is_status());
            assert!(!e.is_connectivity());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!scraper.cache().get(&url).is_hit());
}

#[tokio::test]
async fn test_timeout_is_connectivity_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let scraper = create_scraper(&ScraperConfig::default());
    let scheme = links_scheme();

    let err = scraper
        .scrape(
            Some(&format!("{}/slow", mock_server.uri())),
            Some(&scheme),
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Fetch(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_user_agent_and_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(header("user-agent", "TestScraper/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("results"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = ScraperConfig::default();
    config.http.user_agent = "TestScraper/1.0".to_string();
    let scraper = create_scraper(&config);

    let body = scraper
        .get(FetchRequest::get(format!("{}/search", mock_server.uri())).param("q", "rust"))
        .await
        .unwrap();
    assert_eq!(body, "results");
}
