//! HTTP fetch engine tests
//!
//! Exercises the default reqwest-backed engine against a mock HTTP server:
//! navigation, selector queries, growth extents and error classification.

use geoharvest::fetch::{FetchEngine, FetchError, HttpFetchEngine};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULTS_PAGE: &str = r#"
<html><body>
  <div role="feed">
    <a href="https://www.google.com/maps/place/alpha">Alpha</a>
    <a href="https://www.google.com/maps/place/beta">Beta</a>
    <a href="https://elsewhere.example/not-a-place">Other</a>
  </div>
  <h1 class="DUwDvf"> Cafe Azure </h1>
</body></html>
"#;

#[tokio::test]
async fn test_open_and_query_rendered_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&server)
        .await;

    let engine = HttpFetchEngine::new().unwrap();
    let url = format!("{}/results", server.uri());
    let page = engine.open(&url, Duration::from_secs(5)).await.unwrap();

    let title = page.query("h1.DUwDvf").await.unwrap().unwrap();
    assert_eq!(title.text().trim(), "Cafe Azure");

    let anchors = page
        .query_all("a[href^=\"https://www.google.com/maps/place/\"]")
        .await
        .unwrap();
    assert_eq!(anchors.len(), 2);
    assert_eq!(
        anchors[0].attr("href"),
        Some("https://www.google.com/maps/place/alpha")
    );

    // Static pages report a constant extent: the container's child count
    let extent = page.evaluate_growth("div[role=\"feed\"]").await.unwrap();
    assert_eq!(extent, 3);

    page.close().await;
}

#[tokio::test]
async fn test_missing_page_is_a_navigation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = HttpFetchEngine::new().unwrap();
    let url = format!("{}/gone", server.uri());
    let result = engine.open(&url, Duration::from_secs(5)).await;

    assert!(matches!(result, Err(FetchError::Navigation { .. })));
}

#[tokio::test]
async fn test_slow_page_hits_the_hard_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let engine = HttpFetchEngine::new().unwrap();
    let url = format!("{}/slow", server.uri());
    let result = engine.open(&url, Duration::from_millis(200)).await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_missing_growth_container_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let engine = HttpFetchEngine::new().unwrap();
    let url = format!("{}/empty", server.uri());
    let page = engine.open(&url, Duration::from_secs(5)).await.unwrap();

    let result = page.evaluate_growth("div[role=\"feed\"]").await;
    assert!(matches!(result, Err(FetchError::MissingContainer(_))));

    page.close().await;
}
