//! Soft-block detection.
//!
//! Some sites answer automated clients with 200 OK and an interstitial
//! instead of an error status. These pages are recognised by being empty,
//! by being small and carrying a known marker, or by an exact body hash.

use std::collections::HashSet;
use std::fmt;

use crate::types::page::{hash_body, FetchedPage};

/// Bodies larger than this are never treated as marker-based blocks.
pub const SOFT_BLOCK_MAX_BYTES: usize = 16 * 1024;

/// Lower-case phrases found on challenge and denial pages.
pub const SOFT_BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "access denied",
    "just a moment",
    "attention required",
    "verify you are human",
    "are you a robot",
    "request blocked",
    "pardon our interruption",
    "cf-browser-verification",
];

/// Why a response was treated as a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftBlock {
    Empty,
    Marker(String),
    Fingerprint(String),
}

impl fmt::Display for SoftBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftBlock::Empty => f.write_str("empty body"),
            SoftBlock::Marker(m) => write!(f, "marker '{}'", m),
            SoftBlock::Fingerprint(h) => write!(f, "fingerprint {}", &h[..h.len().min(12)]),
        }
    }
}

/// Recognises soft-block responses.
#[derive(Debug, Clone)]
pub struct SoftBlockDetector {
    markers: Vec<String>,
    fingerprints: HashSet<String>,
    max_marker_bytes: usize,
}

impl Default for SoftBlockDetector {
    fn default() -> Self {
        Self {
            markers: SOFT_BLOCK_MARKERS.iter().map(|m| m.to_string()).collect(),
            fingerprints: HashSet::new(),
            max_marker_bytes: SOFT_BLOCK_MAX_BYTES,
        }
    }
}

impl SoftBlockDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker phrase (matched case-insensitively).
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into().to_lowercase());
        self
    }

    /// Register the exact body of a known block page.
    pub fn with_fingerprint_of(mut self, body: &str) -> Self {
        self.fingerprints.insert(hash_body(body));
        self
    }

    /// Register a hex SHA-256 of a known block page.
    pub fn with_fingerprint(mut self, sha256_hex: impl Into<String>) -> Self {
        self.fingerprints.insert(sha256_hex.into().to_lowercase());
        self
    }

    /// Classify a response body. `None` means the page looks genuine.
    pub fn inspect(&self, page: &FetchedPage) -> Option<SoftBlock> {
        if !page.has_content() {
            return Some(SoftBlock::Empty);
        }

        if !self.fingerprints.is_empty() {
            let hash = page.body_hash();
            if self.fingerprints.contains(&hash) {
                return Some(SoftBlock::Fingerprint(hash));
            }
        }

        if page.content_length() <= self.max_marker_bytes {
            let lower = page.body.to_lowercase();
            if let Some(marker) = self.markers.iter().find(|m| lower.contains(m.as_str())) {
                return Some(SoftBlock::Marker(marker.clone()));
            }
        }

        None
    }
}
