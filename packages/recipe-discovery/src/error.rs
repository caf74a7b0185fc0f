//! Typed errors for the recipe discovery library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// HTTP statuses that indicate the site is actively refusing us.
pub const BLOCKING_STATUSES: [u16; 3] = [403, 429, 503];

/// HTTP statuses worth retrying later.
const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Errors that can occur while fetching a single URL.
///
/// Only the transient/permanent split matters to callers: transient
/// failures are retried, permanent ones abandon the URL for the job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Timeout, connection reset, 429/503 and friends
    #[error("transient fetch failure for {url}: {reason}")]
    Transient {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// 404, malformed response, repeated failure
    #[error("permanent fetch failure for {url}: {reason}")]
    Permanent {
        url: String,
        reason: String,
        status: Option<u16>,
    },
}

impl FetchError {
    /// Build a transient error without an HTTP status.
    pub fn transient(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transient {
            url: url.into(),
            reason: reason.into(),
            status: None,
        }
    }

    /// Build a permanent error without an HTTP status.
    pub fn permanent(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permanent {
            url: url.into(),
            reason: reason.into(),
            status: None,
        }
    }

    /// Map a non-success HTTP status to the matching error kind.
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        let reason = format!("HTTP {}", status);
        if TRANSIENT_STATUSES.contains(&status) {
            Self::Transient {
                url,
                reason,
                status: Some(status),
            }
        } else {
            Self::Permanent {
                url,
                reason,
                status: Some(status),
            }
        }
    }

    /// A fetch that did not complete within its deadline.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::transient(url, "timed out")
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. } | Self::Permanent { url, .. } => url,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Permanent { status, .. } => *status,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether the failure looks like the site blocking automated access.
    pub fn is_blocking(&self) -> bool {
        self.status()
            .map(|s| BLOCKING_STATUSES.contains(&s))
            .unwrap_or(false)
    }

    /// Same failure re-labelled as permanent (used once retries are exhausted).
    pub fn into_permanent(self) -> Self {
        match self {
            Self::Transient {
                url,
                reason,
                status,
            } => Self::Permanent {
                url,
                reason: format!("{} (retries exhausted)", reason),
                status,
            },
            permanent => permanent,
        }
    }
}

/// Errors that are fatal to a single crawl job (never to its siblings).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobSetupError {
    /// Seed URL could not be parsed
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    /// Seed URL itself matches an exclusion pattern
    #[error("seed URL is excluded from crawling: {url}")]
    ExcludedSeed { url: String },

    /// Seed host does not belong to the configured site
    #[error("seed host '{seed_host}' does not match site host '{site_host}'")]
    HostMismatch { seed_host: String, site_host: String },

    /// Job configuration cannot be run
    #[error("invalid job config: {reason}")]
    InvalidConfig { reason: String },
}

/// Errors that abort a whole batch of site jobs.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Batch configuration cannot be run
    #[error("invalid batch config: {reason}")]
    InvalidConfig { reason: String },
}

/// Scoring knobs that break the required signal ordering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("scoring config violates ordering: {0}")]
    Ordering(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },
}

/// A URL that could not be classified.
///
/// Never surfaces from `classify`; it only renders the diagnostic tag.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("parse_error:{0}")]
    Parse(#[from] url::ParseError),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for job setup.
pub type SetupResult<T> = std::result::Result<T, JobSetupError>;

/// Result type alias for batch operations.
pub type BatchResult<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(FetchError::from_status("https://a.com", 429).is_transient());
        assert!(FetchError::from_status("https://a.com", 503).is_transient());
        assert!(FetchError::from_status("https://a.com", 408).is_transient());
        assert!(!FetchError::from_status("https://a.com", 404).is_transient());
        assert!(!FetchError::from_status("https://a.com", 403).is_transient());
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(FetchError::from_status("https://a.com", 403).is_blocking());
        assert!(FetchError::from_status("https://a.com", 429).is_blocking());
        assert!(!FetchError::from_status("https://a.com", 404).is_blocking());
        assert!(!FetchError::timeout("https://a.com").is_blocking());
    }

    #[test]
    fn test_into_permanent() {
        let err = FetchError::timeout("https://a.com/x").into_permanent();
        assert!(!err.is_transient());
        assert_eq!(err.url(), "https://a.com/x");
    }
}
