//! Fetcher trait for pluggable page retrieval.
//!
//! Two implementations sit behind this seam in production: a cheap HTTP
//! client and a heavier anti-scraping fallback. The strategy selector picks
//! between them by policy; nothing downstream inspects which type it got.
//!
//! # Usage
//!
//! ```rust,ignore
//! use recipe_discovery::traits::fetcher::Fetcher;
//!
//! let page = fetcher.fetch("https://example.com/recipes").await?;
//! println!("{} -> {}", page.status, page.final_url);
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::types::page::FetchedPage;

/// Retrieves a single URL.
///
/// Implementations return `Ok` for any HTTP response they received,
/// including 4xx/5xx; `Err` is reserved for failures to get a response at
/// all (DNS, connect, timeout, malformed body).
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one URL.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
