//! Link extractor trait.

/// Pulls outbound links from a fetched page.
pub trait LinkExtractor: Send + Sync {
    /// Absolute, de-duplicated links found in `html`, resolved against `base_url`.
    fn extract(&self, html: &str, base_url: &str) -> Vec<String>;

    fn name(&self) -> &str {
        "unknown"
    }
}
