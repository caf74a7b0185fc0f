//! Pattern catalogs used by the URL classifier.
//!
//! The built-in catalog is compiled once per process and shared read-only
//! by every classifier and every job. Order inside each table is
//! significant: the classifier stops at the first match of each table, so
//! reordering changes scores.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::error::ConfigError;

/// Paths that must never be fetched.
pub const EXCLUDE_PATTERNS: &[(&str, &str)] = &[
    (
        "binary_asset",
        r"\.(jpg|jpeg|png|gif|webp|svg|ico|pdf|zip|mp3|mp4|css|js|xml|json)$",
    ),
    ("about", r"/about/?$"),
    ("contact", r"/contact/?$"),
    ("privacy", r"/privacy/?$"),
    ("terms", r"/terms/?$"),
    ("search", r"/search/?$"),
    ("tag", r"/tag/[a-z0-9-]+/?$"),
    ("author", r"/author/[a-z0-9-]+/?$"),
    ("pagination", r"/page/\d+/?$"),
    ("comment_page", r"/comment-page-\d+/?$"),
    ("trackback", r"/trackback/?$"),
    ("feed", r"/feed/?$"),
    ("wp_content", r"/wp-content/"),
    ("wp_admin", r"/wp-admin/"),
    ("wp_includes", r"/wp-includes/"),
    ("cdn_cgi", r"/cdn-cgi/"),
    ("wp_json", r"/wp-json/"),
    ("xmlrpc", r"/xmlrpc\.php"),
    ("wp_login", r"/wp-login\.php"),
    ("cart", r"/cart/?$"),
    ("checkout", r"/checkout/?$"),
    ("account", r"/account/?$"),
    ("login", r"/login/?$"),
    ("logout", r"/logout/?$"),
    ("register", r"/register/?$"),
    ("my_account", r"/my-account/?$"),
    ("shop", r"/shop/?$"),
    ("store", r"/store/?$"),
    ("share", r"/share/?$"),
    ("print", r"/print/?$"),
    ("email", r"/email/?$"),
    ("subscribe", r"/subscribe/?$"),
    ("newsletter", r"/newsletter/?$"),
    ("follow", r"/follow/?$"),
    ("month_archive", r"/\d{4}/\d{2}/?$"),
    ("year_archive", r"/\d{4}/?$"),
];

/// Paths shaped like a single recipe.
pub const RECIPE_PATTERNS: &[(&str, &str)] = &[
    ("dated_day_slug", r"/\d{4}/\d{2}/\d{2}/[a-z0-9-]+/?$"),
    ("dated_month_slug", r"/\d{4}/\d{2}/[a-z0-9-]+/?$"),
    ("dated_year_slug", r"/\d{4}/[a-z0-9-]+/?$"),
    ("multi_hyphen_slug", r"/[a-z0-9-]+-[a-z0-9-]+-[a-z0-9-]+/?$"),
    ("recipe_id_slug", r"/recipes?/\d+/[a-z0-9-]+/?$"),
    ("recipe_slug_id", r"/recipes?/[a-z0-9-]+/\d+/?$"),
    ("recipe_slug", r"/recipes?/[a-z0-9-]+/?$"),
    ("nested_recipe_slug", r"/[a-z0-9-]+/recipes?/[a-z0-9-]+/?$"),
];

/// Hub pages that list recipes.
pub const CATEGORY_PATTERNS: &[(&str, &str)] = &[
    ("category", r"/category/[a-z0-9-]+/?$"),
    ("categories", r"/categories/[a-z0-9-]+/?$"),
    ("recipes_category", r"/recipes/category/[a-z0-9-]+/?$"),
    ("suffix_recipes", r"/[a-z0-9-]+-recipes/?$"),
    ("diet", r"/diet/[a-z0-9-]+/?$"),
    ("cuisine", r"/cuisine/[a-z0-9-]+/?$"),
    ("course", r"/course/[a-z0-9-]+/?$"),
    ("meal", r"/meal/[a-z0-9-]+/?$"),
    ("recipes_root", r"/recipes/?$"),
    ("recipe_index", r"/recipe-index/?$"),
];

/// `/YYYY/MM[/DD]/slug` with capture groups for the date parts.
pub const DATE_PATTERN: &str = r"/(\d{4})/(\d{2})(?:/(\d{2}))?/[a-z0-9-]+/?$";

/// Recipe vocabulary matched as substrings of the last path segment.
pub const RECIPE_KEYWORDS: &[&str] = &[
    "recipe",
    "dish",
    "meal",
    "cake",
    "bread",
    "stew",
    "roast",
    "bake",
    "cook",
    "food",
    "dinner",
    "lunch",
    "breakfast",
    "dessert",
    "appetizer",
    "snack",
    "drink",
    "cocktail",
    "smoothie",
    "soup",
    "salad",
    "sandwich",
    "pasta",
    "pizza",
    "pie",
    "cookie",
    "muffin",
    "brownie",
    "chicken",
    "beef",
    "pork",
    "fish",
    "vegetarian",
    "vegan",
    "gluten-free",
    "dairy-free",
    "low-carb",
    "nut-free",
    "sugar-free",
    "healthy",
    "quick",
    "easy",
    "simple",
    "traditional",
    "authentic",
    "homemade",
    "from-scratch",
    "slow-cooker",
    "instant-pot",
    "pressure-cooker",
    "grill",
    "barbecue",
    "smoke",
    "fry",
    "saute",
    "steam",
    "boil",
    "broil",
    "microwave",
    "oven",
    "stovetop",
    "casserole",
    "wrap",
    "taco",
    "burrito",
    "sushi",
    "sashimi",
    "poke",
    "ceviche",
    "tartare",
    "carpaccio",
    "charcuterie",
    "platter",
    "board",
    "dip",
    "spread",
    "sauce",
    "condiment",
    "marinade",
];

lazy_static! {
    static ref DEFAULT_CATALOG: Arc<PatternCatalog> = Arc::new(
        PatternCatalog::new(
            EXCLUDE_PATTERNS,
            RECIPE_PATTERNS,
            CATEGORY_PATTERNS,
            RECIPE_KEYWORDS,
        )
        .unwrap()
    );
}

/// A compiled regex with a stable, human-readable label.
#[derive(Debug, Clone)]
pub struct NamedPattern {
    pub name: String,
    pub regex: Regex,
}

impl NamedPattern {
    pub fn compile(name: &str, pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Immutable classification tables.
#[derive(Debug)]
pub struct PatternCatalog {
    exclude: Vec<NamedPattern>,
    recipe: Vec<NamedPattern>,
    category: Vec<NamedPattern>,
    date: Regex,
    keywords: Vec<String>,
}

impl PatternCatalog {
    /// Compile a catalog. Duplicate keywords are dropped, first occurrence wins.
    pub fn new(
        exclude: &[(&str, &str)],
        recipe: &[(&str, &str)],
        category: &[(&str, &str)],
        keywords: &[&str],
    ) -> Result<Self, ConfigError> {
        let compile_all = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(name, pattern)| NamedPattern::compile(name, pattern))
                .collect::<Result<Vec<_>, _>>()
        };

        let date = Regex::new(DATE_PATTERN).map_err(|e| ConfigError::Pattern {
            pattern: DATE_PATTERN.to_string(),
            reason: e.to_string(),
        })?;

        let mut unique: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.to_lowercase();
            if !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }

        Ok(Self {
            exclude: compile_all(exclude)?,
            recipe: compile_all(recipe)?,
            category: compile_all(category)?,
            date,
            keywords: unique,
        })
    }

    /// The process-wide built-in catalog.
    pub fn builtin() -> Arc<PatternCatalog> {
        Arc::clone(&DEFAULT_CATALOG)
    }

    pub fn exclude(&self) -> &[NamedPattern] {
        &self.exclude
    }

    pub fn recipe(&self) -> &[NamedPattern] {
        &self.recipe
    }

    pub fn category(&self) -> &[NamedPattern] {
        &self.category
    }

    pub fn date(&self) -> &Regex {
        &self.date
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First exclusion pattern matching `path`.
    pub fn first_exclusion(&self, path: &str) -> Option<&NamedPattern> {
        self.exclude.iter().find(|p| p.is_match(path))
    }

    /// First recipe pattern matching `path`.
    pub fn first_recipe(&self, path: &str) -> Option<&NamedPattern> {
        self.recipe.iter().find(|p| p.is_match(path))
    }

    /// First category pattern matching `path`.
    pub fn first_category(&self, path: &str) -> Option<&NamedPattern> {
        self.category.iter().find(|p| p.is_match(path))
    }

    /// Keywords contained in `segment`, in catalog order.
    pub fn keywords_in<'a>(&'a self, segment: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.keywords
            .iter()
            .filter(move |kw| segment.contains(kw.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_compiles_and_is_shared() {
        let a = PatternCatalog::builtin();
        let b = PatternCatalog::builtin();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.recipe().len(), RECIPE_PATTERNS.len());
    }

    #[test]
    fn test_keywords_are_deduplicated() {
        let catalog = PatternCatalog::new(&[], &[], &[], &["soup", "stew", "soup"]).unwrap();
        assert_eq!(catalog.keywords(), &["soup".to_string(), "stew".to_string()]);
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let err = PatternCatalog::new(&[("broken", "(")], &[], &[], &[]).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { .. }));
    }

    #[test]
    fn test_first_match_order() {
        let catalog = PatternCatalog::builtin();
        let hit = catalog.first_recipe("/2023/05/01/banana-bread").unwrap();
        assert_eq!(hit.name, "dated_day_slug");
    }

    #[test]
    fn test_keywords_in_segment() {
        let catalog = PatternCatalog::builtin();
        let found: Vec<_> = catalog.keywords_in("chicken-parmesan-recipe").collect();
        assert_eq!(found, vec!["recipe", "chicken"]);
    }
}
