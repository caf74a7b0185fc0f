//! Firecrawl-based fallback fetcher.
//!
//! Uses the Firecrawl API for sites that block plain HTTP clients. The API
//! renders JavaScript and handles anti-bot protection; it is slower and
//! billed per page, so the strategy selector only reaches for it when the
//! cheap fetcher is blocked.
//!
//! Requires the `firecrawl` feature to be enabled.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::Fetcher;
use crate::types::page::FetchedPage;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Firecrawl `/scrape` fetcher returning raw HTML.
///
/// # Example
///
/// ```rust,ignore
/// use recipe_discovery::fetchers::FirecrawlFetcher;
///
/// let fetcher = FirecrawlFetcher::from_env()?;
/// let page = fetcher.fetch("https://example.com").await?;
/// ```
pub struct FirecrawlFetcher {
    client: Client,
    api_key: String,
    base_url: String,
}

// Request/Response types for Firecrawl API

#[derive(Serialize)]
struct ScrapeRequest {
    url: String,
    formats: Vec<String>,
    #[serde(rename = "onlyMainContent")]
    only_main_content: bool,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    #[serde(rename = "rawHtml")]
    raw_html: Option<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
struct PageMetadata {
    #[serde(rename = "statusCode")]
    status_code: Option<u16>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    url: Option<String>,
}

impl FirecrawlFetcher {
    /// Create a new Firecrawl fetcher with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: FIRECRAWL_API_URL.to_string(),
        })
    }

    /// Create from environment variable `FIRECRAWL_API_KEY`.
    ///
    /// Returns `None` when the variable is unset or empty.
    pub fn from_env() -> Option<Result<Self, reqwest::Error>> {
        match std::env::var("FIRECRAWL_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(key)),
            _ => None,
        }
    }

    /// Point at a different API root (self-hosted Firecrawl, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn into_page(url: &str, data: ScrapeData) -> FetchResult<FetchedPage> {
        let html = data
            .raw_html
            .ok_or_else(|| FetchError::permanent(url, "no rawHtml returned from Firecrawl"))?;

        let (status, final_url) = match data.metadata {
            Some(meta) => (
                meta.status_code.unwrap_or(200),
                meta.url.or(meta.source_url).unwrap_or_else(|| url.to_string()),
            ),
            None => (200, url.to_string()),
        };

        Ok(FetchedPage::new(url, html)
            .with_status(status)
            .with_final_url(final_url)
            .with_fetched_at(Utc::now()))
    }
}

#[async_trait]
impl Fetcher for FirecrawlFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        debug!(url = %url, "Firecrawl scrape starting");
        let request = ScrapeRequest {
            url: url.to_string(),
            formats: vec!["rawHtml".to_string()],
            only_main_content: false,
        };

        let response = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::timeout(url)
                } else {
                    FetchError::transient(url, format!("Firecrawl request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Firecrawl API error");
            let mut err = FetchError::from_status(url, status.as_u16());
            if let FetchError::Transient { reason, .. } | FetchError::Permanent { reason, .. } =
                &mut err
            {
                *reason = format!("Firecrawl API error: {} - {}", status, text);
            }
            return Err(err);
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::permanent(url, format!("malformed Firecrawl response: {}", e)))?;

        if !body.success {
            return Err(FetchError::permanent(
                url,
                body.error
                    .unwrap_or_else(|| "Firecrawl scrape failed".to_string()),
            ));
        }

        let data = body
            .data
            .ok_or_else(|| FetchError::permanent(url, "no data returned from Firecrawl"))?;

        Self::into_page(url, data)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fetcher() {
        // This should succeed even without a valid API key (for construction)
        let fetcher = FirecrawlFetcher::new("test-key").unwrap();
        assert_eq!(fetcher.name(), "firecrawl");
    }

    #[test]
    fn test_into_page_uses_metadata() {
        let data = ScrapeData {
            raw_html: Some("<html>ok</html>".to_string()),
            metadata: Some(PageMetadata {
                status_code: Some(200),
                source_url: Some("https://example.com/a".to_string()),
                url: Some("https://www.example.com/a".to_string()),
            }),
        };

        let page = FirecrawlFetcher::into_page("https://example.com/a", data).unwrap();
        assert_eq!(page.final_url, "https://www.example.com/a");
        assert_eq!(page.status, 200);
    }

    #[test]
    fn test_into_page_without_html() {
        let data = ScrapeData {
            raw_html: None,
            metadata: None,
        };
        let err = FirecrawlFetcher::into_page("https://example.com/a", data).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let fetcher = FirecrawlFetcher::new("k")
            .unwrap()
            .with_base_url("http://localhost:3002/v1/");
        assert_eq!(fetcher.base_url, "http://localhost:3002/v1");
    }
}
