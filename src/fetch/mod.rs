//! Page-fetch engine contract
//!
//! The crawl engine only ever talks to a fetch engine through these traits:
//! open a URL in a browsing context bounded by a timeout, query rendered
//! content by selector, trigger growth of a scrollable container and read its
//! extent, and tear the page down. The default HTTP adapter lives in
//! [`http`]; tests script their own engines.

mod http;

pub use http::HttpFetchEngine;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a fetch engine
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Navigation timed out for {url}")]
    Timeout { url: String },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Container not found: {0}")]
    MissingContainer(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// A matched element with its content materialized at query time
///
/// Handles carry owned data rather than live page references: the text and
/// attributes are read once when the query runs.
#[derive(Debug, Clone, Default)]
pub struct Element {
    text: String,
    attrs: HashMap<String, String>,
}

impl Element {
    pub fn new(text: impl Into<String>, attrs: HashMap<String, String>) -> Self {
        Self {
            text: text.into(),
            attrs,
        }
    }

    /// The element's text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// An attribute value, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// An open page in a browsing context
#[async_trait]
pub trait PageHandle: Send {
    /// Returns the first element matching `selector`, or None
    async fn query(&self, selector: &str) -> FetchResult<Option<Element>>;

    /// Returns every element matching `selector`
    async fn query_all(&self, selector: &str) -> FetchResult<Vec<Element>>;

    /// Triggers growth of the scrollable container matched by
    /// `container_selector` and returns its current extent.
    ///
    /// Errors if the container cannot be found on the page.
    async fn evaluate_growth(&self, container_selector: &str) -> FetchResult<u64>;

    /// Releases the page and any resources behind it.
    ///
    /// Callers must close on every path, including failures.
    async fn close(self: Box<Self>);
}

/// An engine that loads URLs into isolated page handles
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Loads `url`, bounded by `timeout` as a hard ceiling.
    ///
    /// Returns `FetchError::Timeout` when the ceiling is hit and
    /// `FetchError::Navigation` for any other load failure.
    async fn open(&self, url: &str, timeout: Duration) -> FetchResult<Box<dyn PageHandle>>;
}
