//! URL classification.
//!
//! Classification is a pure function of the URL path: no I/O, no shared
//! mutable state. The rules run in a fixed order:
//!
//! 1. Exclusion: first matching exclusion pattern wins outright.
//! 2. Recipe path: first matching recipe pattern adds a fixed bonus.
//! 3. Keywords: vocabulary hits in the last path segment, capped.
//! 4. Category: first matching hub pattern adds a fixed bonus.
//! 5. Decision between recipe, category and unknown.
//! 6. Date override for `/YYYY/MM[/DD]/slug` paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use recipe_discovery::classifier::UrlClassifier;
//!
//! let classifier = UrlClassifier::new();
//! let c = classifier.classify("https://example.com/2023/05/01/banana-bread/");
//! assert!(c.is_recipe());
//! ```

pub mod catalog;

use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::trace;
use url::Url;

use crate::error::{ClassificationError, ConfigError};
use crate::types::classification::{CategorizedUrls, UrlClassification, UrlDate, UrlKind};
use crate::types::config::ScoringConfig;

pub use catalog::{NamedPattern, PatternCatalog};

lazy_static! {
    static ref DEFAULT_CLASSIFIER: UrlClassifier = UrlClassifier::new();
}

/// Classify with the built-in catalog and default scoring.
pub fn classify(url: &str) -> UrlClassification {
    DEFAULT_CLASSIFIER.classify(url)
}

/// Scores URLs against a [`PatternCatalog`].
///
/// Cheap to clone; the catalog is shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    catalog: Arc<PatternCatalog>,
    scoring: ScoringConfig,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlClassifier {
    /// Built-in catalog, default scoring.
    pub fn new() -> Self {
        Self {
            catalog: PatternCatalog::builtin(),
            scoring: ScoringConfig::default(),
        }
    }

    /// Built-in catalog with custom scoring knobs.
    pub fn with_scoring(scoring: ScoringConfig) -> Result<Self, ConfigError> {
        Self::with_catalog(PatternCatalog::builtin(), scoring)
    }

    /// Custom catalog and scoring.
    pub fn with_catalog(
        catalog: Arc<PatternCatalog>,
        scoring: ScoringConfig,
    ) -> Result<Self, ConfigError> {
        scoring.validate()?;
        Ok(Self { catalog, scoring })
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Classify a single absolute URL. Never fails.
    pub fn classify(&self, url: &str) -> UrlClassification {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                let tag = ClassificationError::from(e).to_string();
                trace!(url = %url, "unparsable url classified as unknown");
                return UrlClassification::new(url, UrlKind::Unknown, 0, vec![tag], None);
            }
        };
        let path = parsed.path().to_lowercase();
        self.classify_path(url, &path)
    }

    fn classify_path(&self, url: &str, path: &str) -> UrlClassification {
        let scoring = &self.scoring;
        let mut features = Vec::new();

        if let Some(pattern) = self.catalog.first_exclusion(path) {
            features.push(format!("matched_exclude_pattern:{}", pattern.name));
            return UrlClassification::new(
                url,
                UrlKind::Excluded,
                scoring.exclusion_score,
                features,
                None,
            );
        }

        let mut recipe_score: u32 = 0;
        if let Some(pattern) = self.catalog.first_recipe(path) {
            recipe_score += scoring.recipe_pattern_bonus as u32;
            features.push(format!("matched_recipe_pattern:{}", pattern.name));
        }

        let last_segment = path.trim_matches('/').rsplit('/').next().unwrap_or("");
        if !last_segment.is_empty() {
            let mut hits: u32 = 0;
            for keyword in self.catalog.keywords_in(last_segment) {
                hits += 1;
                features.push(format!("recipe_keyword:{}", keyword));
            }
            if hits > 0 {
                recipe_score +=
                    (hits * scoring.per_keyword as u32).min(scoring.keyword_cap as u32);
            }
        }

        let mut category_score: u32 = 0;
        if let Some(pattern) = self.catalog.first_category(path) {
            category_score += scoring.category_bonus as u32;
            features.push(format!("matched_category_pattern:{}", pattern.name));
        }

        let (mut kind, mut score) = if recipe_score > category_score
            && recipe_score >= scoring.recipe_threshold as u32
        {
            (UrlKind::Recipe, recipe_score)
        } else if category_score > 0 {
            (UrlKind::Category, category_score)
        } else {
            (UrlKind::Unknown, 0)
        };

        let date = self.date_of(path);
        if date.is_some() {
            kind = UrlKind::Recipe;
            score = score.max(scoring.date_floor as u32);
            features.push("date_based_url".to_string());
        }

        UrlClassification::new(url, kind, score.min(100) as u8, features, date)
    }

    fn date_of(&self, path: &str) -> Option<UrlDate> {
        let caps = self.catalog.date().captures(path)?;
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day = caps.get(3).and_then(|d| d.as_str().parse().ok());
        Some(UrlDate { year, month, day })
    }

    /// Recipe verdict at or above the configured threshold.
    pub fn is_likely_recipe(&self, url: &str) -> bool {
        let c = self.classify(url);
        c.is_recipe() && c.score >= self.scoring.recipe_threshold
    }

    pub fn is_likely_category(&self, url: &str) -> bool {
        self.classify(url).is_category()
    }

    pub fn should_exclude(&self, url: &str) -> bool {
        self.classify(url).is_excluded()
    }

    /// Split URLs by verdict, dropping excluded ones. Input order is kept.
    pub fn categorize<I, S>(&self, urls: I) -> CategorizedUrls
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = CategorizedUrls::default();
        for url in urls {
            let url = url.as_ref();
            match self.classify(url).kind {
                UrlKind::Recipe => out.recipe.push(url.to_string()),
                UrlKind::Category => out.category.push(url.to_string()),
                UrlKind::Unknown => out.other.push(url.to_string()),
                UrlKind::Excluded => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_url_is_recipe() {
        let c = classify("https://example.com/2023/05/01/banana-bread/");
        assert_eq!(c.kind, UrlKind::Recipe);
        assert!(c.score >= 70);
        assert_eq!(
            c.date,
            Some(UrlDate {
                year: 2023,
                month: 5,
                day: Some(1)
            })
        );
        assert!(c.has_feature("date_based_url"));
        assert!(c.has_feature("matched_recipe_pattern:dated_day_slug"));
    }

    #[test]
    fn test_month_date_has_no_day() {
        let c = classify("https://example.com/2021/11/pumpkin-soup");
        assert_eq!(c.kind, UrlKind::Recipe);
        assert_eq!(c.date.unwrap().day, None);
    }

    #[test]
    fn test_category_page() {
        let c = classify("https://example.com/category/desserts/");
        assert_eq!(c.kind, UrlKind::Category);
        assert_eq!(c.score, 40);
        assert!(c.has_feature("recipe_keyword:dessert"));
    }

    #[test]
    fn test_excluded_page() {
        let c = classify("https://example.com/about/");
        assert_eq!(c.kind, UrlKind::Excluded);
        assert_eq!(c.score, 100);
        assert_eq!(c.features, vec!["matched_exclude_pattern:about".to_string()]);
    }

    #[test]
    fn test_exclusion_beats_date() {
        let c = classify("https://example.com/wp-content/2023/05/01/banana-bread");
        assert_eq!(c.kind, UrlKind::Excluded);
        assert!(c.date.is_none());
    }

    #[test]
    fn test_root_is_unknown() {
        let c = classify("https://example.com/");
        assert_eq!(c.kind, UrlKind::Unknown);
        assert_eq!(c.score, 0);
    }

    #[test]
    fn test_multi_hyphen_slug_with_keywords() {
        let c = classify("https://example.com/chicken-parmesan-recipe/");
        assert_eq!(c.kind, UrlKind::Recipe);
        assert_eq!(c.score, 60);
    }

    #[test]
    fn test_keyword_only_below_threshold_is_unknown() {
        // One keyword, no pattern: 10 points is not enough for a recipe.
        let c = classify("https://example.com/soup");
        assert_eq!(c.kind, UrlKind::Unknown);
        assert_eq!(c.score, 0);
    }

    #[test]
    fn test_keyword_cap() {
        let c = classify("https://example.com/x/easy-quick-healthy-vegan-soup");
        // pattern 40 + capped keywords 30
        assert_eq!(c.kind, UrlKind::Recipe);
        assert_eq!(c.score, 70);
    }

    #[test]
    fn test_unparsable_url() {
        let c = classify("not a url at all");
        assert_eq!(c.kind, UrlKind::Unknown);
        assert_eq!(c.score, 0);
        assert!(c.has_feature("parse_error:"));
    }

    #[test]
    fn test_path_is_lowercased() {
        let c = classify("https://example.com/ABOUT");
        assert!(c.is_excluded());
    }

    #[test]
    fn test_helpers() {
        let classifier = UrlClassifier::new();
        assert!(classifier.is_likely_recipe("https://a.com/2024/08/15/fish-tacos"));
        assert!(classifier.is_likely_category("https://a.com/cuisine/italian"));
        assert!(classifier.should_exclude("https://a.com/cart"));
    }

    #[test]
    fn test_categorize_drops_excluded() {
        let classifier = UrlClassifier::new();
        let split = classifier.categorize([
            "https://a.com/2024/08/15/fish-tacos",
            "https://a.com/about",
            "https://a.com/cuisine/italian",
            "https://a.com/",
        ]);
        assert_eq!(split.recipe, vec!["https://a.com/2024/08/15/fish-tacos"]);
        assert_eq!(split.category, vec!["https://a.com/cuisine/italian"]);
        assert_eq!(split.other, vec!["https://a.com/"]);
    }

    #[test]
    fn test_invalid_scoring_is_rejected() {
        let scoring = ScoringConfig::default().with_keywords(10, 60);
        assert!(UrlClassifier::with_scoring(scoring).is_err());
    }
}
