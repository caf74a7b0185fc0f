//! Cheap HTTP fetcher.
//!
//! Plain `reqwest` with browser-like headers and a rotating user agent.
//! No JavaScript rendering; sites that need it are handled by the fallback.

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::Fetcher;
use crate::types::page::FetchedPage;

/// Desktop and tablet browser user agents rotated per request.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/119.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/119.0.6045.109 Mobile/15E148 Safari/604.1",
];

const MAX_REDIRECTS: usize = 5;

/// HTTP fetcher that returns the response for any status code.
///
/// # Example
///
/// ```rust,ignore
/// use recipe_discovery::fetchers::HttpFetcher;
///
/// let fetcher = HttpFetcher::new(Duration::from_secs(30))?;
/// let page = fetcher.fetch("https://example.com").await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agents: Vec<String>,
}

impl HttpFetcher {
    /// Create a fetcher with browser-like default headers.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            user_agents: USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        })
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Use a single fixed user agent instead of the rotating pool.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agents = vec![user_agent.into()];
        self
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(USER_AGENTS[0])
    }

    fn map_send_error(url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::timeout(url)
        } else if err.is_redirect() {
            FetchError::permanent(url, "too many redirects")
        } else if err.is_builder() {
            FetchError::permanent(url, format!("invalid request: {}", err))
        } else {
            // connect errors, resets, truncated responses
            FetchError::transient(url, err.to_string())
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        debug!(url = %url, "HTTP fetch starting");
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, self.pick_user_agent())
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                Self::map_send_error(url, e)
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::permanent(url, format!("malformed response body: {}", e))
            }
        })?;

        debug!(
            url = %url,
            status = status,
            content_length = body.len(),
            "HTTP fetch finished"
        );

        Ok(FetchedPage::new(url, body)
            .with_status(status)
            .with_final_url(final_url)
            .with_fetched_at(Utc::now()))
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_user_agent() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5))
            .unwrap()
            .with_user_agent("RecipeBot/1.0");
        assert_eq!(fetcher.pick_user_agent(), "RecipeBot/1.0");
    }

    #[test]
    fn test_rotating_user_agent_comes_from_pool() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&fetcher.pick_user_agent()));
        }
    }

    #[test]
    fn test_browser_headers() {
        let headers = browser_headers();
        assert!(headers.contains_key(header::ACCEPT));
        assert!(headers.contains_key(header::ACCEPT_LANGUAGE));
    }
}
