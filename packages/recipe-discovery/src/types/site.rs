//! Per-site configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{JobSetupError, SetupResult};

/// Hosts known to block plain HTTP clients.
pub const KNOWN_ANTI_SCRAPING_HOSTS: &[&str] = &[
    "theloopywhisk.com",
    "nytimes.com",
    "cooking.nytimes.com",
    "bonappetit.com",
    "epicurious.com",
    "foodandwine.com",
    "seriouseats.com",
    "smittenkitchen.com",
    "thekitchn.com",
];

/// Hub paths common to recipe sites, tried as alternate entry points.
pub const COMMON_CATEGORY_PATHS: &[&str] = &[
    "/recipes",
    "/recipe-index",
    "/diet/gluten-free",
    "/diet/dairy-free",
    "/diet/vegan",
    "/diet/vegetarian",
    "/category/desserts",
    "/category/main-dishes",
    "/category/breakfast",
    "/category/dinner",
    "/category/lunch",
    "/category/appetizers",
    "/category/snacks",
    "/category/drinks",
    "/category/baking",
];

/// Site-level settings, loaded once and read-only for a job's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Lower-cased host name
    pub host: String,

    /// Skip the cheap fetcher and go straight to the fallback
    #[serde(default)]
    pub known_anti_scraping: bool,

    /// Absolute URLs the fallback walks, in order, when the primary URL fails
    #[serde(default)]
    pub alternate_entry_points: Vec<String>,
}

impl SiteConfig {
    /// Bare config for a host: no anti-scraping flag, no alternates.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            known_anti_scraping: false,
            alternate_entry_points: Vec::new(),
        }
    }

    /// Derive a config from a seed URL.
    ///
    /// The anti-scraping flag comes from [`KNOWN_ANTI_SCRAPING_HOSTS`] and the
    /// alternates from [`COMMON_CATEGORY_PATHS`] on the seed's origin.
    pub fn for_seed(seed_url: &str) -> SetupResult<Self> {
        let url = Url::parse(seed_url).map_err(|e| JobSetupError::InvalidSeed {
            url: seed_url.to_string(),
            reason: e.to_string(),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| JobSetupError::InvalidSeed {
                url: seed_url.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_ascii_lowercase();

        let origin = url.origin().ascii_serialization();
        let alternates = COMMON_CATEGORY_PATHS
            .iter()
            .map(|path| format!("{}{}", origin, path))
            .collect();

        let known_anti_scraping = KNOWN_ANTI_SCRAPING_HOSTS
            .iter()
            .any(|known| same_site(&host, known));

        Ok(Self {
            host,
            known_anti_scraping,
            alternate_entry_points: alternates,
        })
    }

    /// Mark the site as hostile to the cheap fetcher.
    pub fn anti_scraping(mut self) -> Self {
        self.known_anti_scraping = true;
        self
    }

    /// Replace the alternate entry points.
    pub fn with_alternates<I, S>(mut self, alternates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_entry_points = alternates.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `host` belongs to this site (a leading `www.` is ignored).
    pub fn owns_host(&self, host: &str) -> bool {
        same_site(host, &self.host)
    }
}

/// Compare hosts ignoring case and a leading `www.`.
pub fn same_site(a: &str, b: &str) -> bool {
    let strip = |h: &str| {
        let lower = h.to_ascii_lowercase();
        lower
            .strip_prefix("www.")
            .map(str::to_string)
            .unwrap_or(lower)
    };
    strip(a) == strip(b)
}
