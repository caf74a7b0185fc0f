//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the discovery library
//! without making real network calls.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::Fetcher;
use crate::types::page::FetchedPage;

/// A scripted response returned by [`MockFetcher`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    Page { status: u16, body: String },
    Error(FetchError),
}

/// A mock fetcher with scripted per-URL responses.
///
/// Each URL holds a queue of responses. Calls consume the queue front to
/// back and the last response repeats forever, so
/// `.with_error(url, e).with_page(url, html)` fails once and then succeeds.
/// Unscripted URLs answer 404. Clones share state.
#[derive(Clone, Default)]
pub struct MockFetcher {
    /// Scripted responses by URL
    responses: Arc<RwLock<HashMap<String, VecDeque<MockResponse>>>>,

    /// Artificial latency per call
    delay: Option<Duration>,

    /// Name reported to logs
    name: Option<String>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name reported by [`Fetcher::name`].
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response for a URL.
    pub fn with_response(self, url: impl Into<String>, response: MockResponse) -> Self {
        self.responses
            .write()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a 200 page.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_response(
            url,
            MockResponse::Page {
                status: 200,
                body: body.into(),
            },
        )
    }

    /// Queue a bare status response.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.with_response(
            url,
            MockResponse::Page {
                status,
                body: format!("<html><body>HTTP {}</body></html>", status),
            },
        )
    }

    /// Queue an error.
    pub fn with_error(self, url: impl Into<String>, error: FetchError) -> Self {
        self.with_response(url, MockResponse::Error(error))
    }

    /// Get all URLs fetched through this mock, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// How many times one URL was fetched.
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.read().unwrap().iter().filter(|u| *u == url).count()
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.write().unwrap();
        let queue = responses.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.calls.write().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_response(url) {
            Some(MockResponse::Page { status, body }) => {
                Ok(FetchedPage::new(url, body).with_status(status))
            }
            Some(MockResponse::Error(err)) => Err(err),
            None => Ok(FetchedPage::new(url, "").with_status(404)),
        }
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("mock")
    }
}

/// An in-memory site: a link graph rendered to HTML on demand.
///
/// ```rust,ignore
/// let site = StaticSite::new("https://example.com")
///     .page("/", &["/2023/05/01/banana-bread/", "/category/desserts/", "/about/"])
///     .page("/category/desserts", &["/2023/05/02/lemon-tart/"]);
/// let fetcher = site.fetcher();
/// ```
#[derive(Debug, Clone)]
pub struct StaticSite {
    origin: String,
    pages: Vec<(String, Vec<String>)>,
}

impl StaticSite {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            pages: Vec::new(),
        }
    }

    /// Add a page at `path` linking to `links` (site-relative or absolute).
    pub fn page(mut self, path: &str, links: &[&str]) -> Self {
        self.pages.push((
            path.to_string(),
            links.iter().map(|l| l.to_string()).collect(),
        ));
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// HTML document linking to `links`.
    pub fn render(links: &[String]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!("<li><a href=\"{}\">{}</a></li>\n", l, l))
            .collect();
        format!("<html><body><ul>\n{}</ul></body></html>", anchors)
    }

    /// Mock fetcher serving every page, under both slash variants of its URL.
    pub fn fetcher(&self) -> MockFetcher {
        self.pages
            .iter()
            .fold(MockFetcher::new(), |fetcher, (path, links)| {
                let body = Self::render(links);
                let url = self.url(path);
                let alternate = if url.ends_with('/') {
                    url.trim_end_matches('/').to_string()
                } else {
                    format!("{}/", url)
                };
                fetcher.with_page(url, body.clone()).with_page(alternate, body)
            })
    }
}

/// A site with no end: every page links to fresh recipe pages and one
/// fresh unknown page, so the link graph never runs out.
#[derive(Debug, Default)]
pub struct EndlessSite {
    origin: String,
    counter: AtomicU64,
    fetches: AtomicU64,
}

impl EndlessSite {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Fetcher for EndlessSite {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let links = vec![
            format!("{}/2024/01/01/dish-number-{}", self.origin, n),
            format!("{}/2024/01/02/dish-number-{}", self.origin, n),
            format!("{}/more/page{}", self.origin, n),
            // Back edge to the root
            format!("{}/", self.origin),
        ];
        Ok(FetchedPage::new(url, StaticSite::render(&links)))
    }

    fn name(&self) -> &str {
        "endless"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_sequence_repeats_last() {
        let fetcher = MockFetcher::new()
            .with_error("https://a.com/", FetchError::timeout("https://a.com/"))
            .with_page("https://a.com/", "ok");

        assert!(fetcher.fetch("https://a.com/").await.is_err());
        assert_eq!(fetcher.fetch("https://a.com/").await.unwrap().body, "ok");
        assert_eq!(fetcher.fetch("https://a.com/").await.unwrap().body, "ok");
        assert_eq!(fetcher.calls_for("https://a.com/"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_url_is_not_found() {
        let page = MockFetcher::new().fetch("https://a.com/x").await.unwrap();
        assert_eq!(page.status, 404);
    }

    #[tokio::test]
    async fn test_static_site_serves_both_slash_forms() {
        let site = StaticSite::new("https://a.com").page("/recipes/", &["/recipe/toast"]);
        let fetcher = site.fetcher();
        let with = fetcher.fetch("https://a.com/recipes/").await.unwrap();
        let without = fetcher.fetch("https://a.com/recipes").await.unwrap();
        assert!(with.body.contains("/recipe/toast"));
        assert_eq!(with.body, without.body);
    }
}
