//! Classification verdicts for discovered URLs.

use serde::{Deserialize, Serialize};

/// Lowest score a `Recipe` verdict may carry.
pub const MIN_RECIPE_SCORE: u8 = 40;

/// Categorical verdict for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    /// Looks like a single recipe page
    Recipe,
    /// A hub page listing recipes
    Category,
    /// Noise that must never be fetched
    Excluded,
    /// No signal either way
    Unknown,
}

impl UrlKind {
    /// Frontier rank: higher pops first. `Excluded` never enters the frontier.
    pub fn rank(self) -> u8 {
        match self {
            UrlKind::Recipe => 3,
            UrlKind::Category => 2,
            UrlKind::Unknown => 1,
            UrlKind::Excluded => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UrlKind::Recipe => "recipe",
            UrlKind::Category => "category",
            UrlKind::Excluded => "excluded",
            UrlKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for UrlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication date encoded in a `/YYYY/MM[/DD]/slug` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlDate {
    pub year: u16,
    pub month: u8,
    pub day: Option<u8>,
}

/// Result of classifying one URL.
///
/// Produced fresh per URL and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlClassification {
    /// The URL as given to the classifier
    pub url: String,

    /// Verdict
    pub kind: UrlKind,

    /// Confidence in `[0, 100]`
    pub score: u8,

    /// Diagnostic tags in the order the rules fired.
    ///
    /// Observability only; nothing downstream branches on these.
    #[serde(default)]
    pub features: Vec<String>,

    /// Present when the path encodes a publication date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<UrlDate>,
}

impl UrlClassification {
    pub(crate) fn new(
        url: impl Into<String>,
        kind: UrlKind,
        score: u8,
        features: Vec<String>,
        date: Option<UrlDate>,
    ) -> Self {
        Self {
            url: url.into(),
            kind,
            score: score.min(100),
            features,
            date,
        }
    }

    pub fn is_recipe(&self) -> bool {
        self.kind == UrlKind::Recipe
    }

    pub fn is_category(&self) -> bool {
        self.kind == UrlKind::Category
    }

    pub fn is_excluded(&self) -> bool {
        self.kind == UrlKind::Excluded
    }

    /// Whether a diagnostic tag with this prefix was recorded.
    pub fn has_feature(&self, prefix: &str) -> bool {
        self.features.iter().any(|f| f.starts_with(prefix))
    }
}

/// URLs split by verdict, excluded URLs dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedUrls {
    pub recipe: Vec<String>,
    pub category: Vec<String>,
    pub other: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_rank_order() {
        assert!(UrlKind::Recipe.rank() > UrlKind::Category.rank());
        assert!(UrlKind::Category.rank() > UrlKind::Unknown.rank());
        assert!(UrlKind::Unknown.rank() > UrlKind::Excluded.rank());
    }

    #[test]
    fn test_score_is_clamped() {
        let c = UrlClassification::new("https://a.com/x", UrlKind::Recipe, 250, vec![], None);
        assert_eq!(c.score, 100);
    }

    #[test]
    fn test_serializes_kind_snake_case() {
        let c = UrlClassification::new("https://a.com/", UrlKind::Unknown, 0, vec![], None);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["kind"], "unknown");
        assert!(json.get("date").is_none());
    }
}
