//! HTTP fetch engine
//!
//! A fetch engine for static pages: documents are fetched once with reqwest
//! and selector queries run against the fetched markup with the scraper
//! crate. Growth evaluation reports the container's child-element count, so a
//! static result list stabilizes immediately.

use crate::fetch::{Element, FetchEngine, FetchError, FetchResult, PageHandle};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;

/// Fetch engine backed by a plain HTTP client
pub struct HttpFetchEngine {
    client: Client,
}

impl HttpFetchEngine {
    /// Builds the engine with its HTTP client
    pub fn new() -> Result<Self, reqwest::Error> {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchEngine for HttpFetchEngine {
    async fn open(&self, url: &str, timeout: Duration) -> FetchResult<Box<dyn PageHandle>> {
        let fetch = async {
            let response = self.client.get(url).send().await?;
            let response = response.error_for_status()?;
            response.text().await
        };

        let body = match tokio::time::timeout(timeout, fetch).await {
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(FetchError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(body)) => body,
        };

        Ok(Box::new(HttpPage { body }))
    }
}

/// A fetched document held as markup
struct HttpPage {
    body: String,
}

// scraper's Html is not Send, so documents are parsed inside synchronous
// helpers and only owned Elements cross await points.

fn parse_selector(selector: &str) -> FetchResult<Selector> {
    Selector::parse(selector).map_err(|_| FetchError::Selector(selector.to_string()))
}

fn materialize(el: ElementRef) -> Element {
    let text: String = el.text().collect();
    let attrs: HashMap<String, String> = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Element::new(text, attrs)
}

fn select_first(body: &str, selector: &str) -> FetchResult<Option<Element>> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(body);
    Ok(doc.select(&sel).next().map(materialize))
}

fn select_all(body: &str, selector: &str) -> FetchResult<Vec<Element>> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(body);
    Ok(doc.select(&sel).map(materialize).collect())
}

fn container_extent(body: &str, selector: &str) -> FetchResult<u64> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(body);
    let container = doc
        .select(&sel)
        .next()
        .ok_or_else(|| FetchError::MissingContainer(selector.to_string()))?;
    let children = container
        .children()
        .filter(|child| child.value().is_element())
        .count();
    Ok(children as u64)
}

#[async_trait]
impl PageHandle for HttpPage {
    async fn query(&self, selector: &str) -> FetchResult<Option<Element>> {
        select_first(&self.body, selector)
    }

    async fn query_all(&self, selector: &str) -> FetchResult<Vec<Element>> {
        select_all(&self.body, selector)
    }

    async fn evaluate_growth(&self, container_selector: &str) -> FetchResult<u64> {
        container_extent(&self.body, container_selector)
    }

    async fn close(self: Box<Self>) {}
}
