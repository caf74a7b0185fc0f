//! Fetched page types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A response returned by a fetcher.
///
/// Fetchers return a page for any status they received; turning a
/// non-success status into a [`FetchError`](crate::error::FetchError)
/// is the strategy selector's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Raw response body (usually HTML)
    pub body: String,

    /// URL after redirects
    pub final_url: String,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    /// Create a 200 response whose final URL equals the requested one.
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Set the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set the post-redirect URL.
    pub fn with_final_url(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = final_url.into();
        self
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if this page has content.
    pub fn has_content(&self) -> bool {
        !self.body.trim().is_empty()
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// SHA-256 of the body, hex encoded.
    pub fn body_hash(&self) -> String {
        hash_body(&self.body)
    }
}

/// Calculate SHA-256 hash of a response body.
pub fn hash_body(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// A fetched page together with the fetcher that produced it.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub page: FetchedPage,

    /// Whether the fallback fetcher produced this page
    pub used_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_builder() {
        let page = FetchedPage::new("https://example.com/a", "<html></html>")
            .with_status(301)
            .with_final_url("https://www.example.com/a");

        assert_eq!(page.status, 301);
        assert_eq!(page.final_url, "https://www.example.com/a");
        assert!(!page.is_success());
        assert!(page.has_content());
    }

    #[test]
    fn test_hash_is_stable() {
        let a = FetchedPage::new("https://a.com", "blocked");
        let b = FetchedPage::new("https://b.com", "blocked");
        assert_eq!(a.body_hash(), b.body_hash());
        assert_eq!(a.body_hash().len(), 64);
    }
}
