//! Property tests for classification and frontier deduplication.

use proptest::prelude::*;
use recipe_discovery::{
    classify, CrawlBudget, Frontier, FrontierEntry, PushOutcome, UrlClassifier, UrlKind,
    MIN_RECIPE_SCORE,
};

fn slug() -> impl Strategy<Value = String> {
    "[a-z]{2,8}(-[a-z]{2,8}){1,3}"
}

fn exclusion_path() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "/about/",
        "/wp-admin/options.php",
        "/cart",
        "/tag/dessert/",
        "/page/3/",
        "/feed/",
        "/wp-content/uploads/cake.jpg",
        "/privacy",
    ])
}

proptest! {
    #[test]
    fn exclusion_always_wins(prefix in "(/[a-z]{1,6}){0,2}", path in exclusion_path()) {
        let url = format!("https://example.com{}{}", prefix, path);
        let c = classify(&url);
        prop_assert_eq!(c.kind, UrlKind::Excluded);
        prop_assert_eq!(c.score, 100);
    }

    #[test]
    fn dated_paths_are_recipes(
        year in 1990u16..2030,
        month in 1u8..=12,
        day in prop::option::of(1u8..=28),
        slug in slug(),
    ) {
        let path = match day {
            Some(day) => format!("/{:04}/{:02}/{:02}/{}", year, month, day, slug),
            None => format!("/{:04}/{:02}/{}", year, month, slug),
        };
        let c = classify(&format!("https://example.com{}", path));

        prop_assert_eq!(c.kind, UrlKind::Recipe);
        prop_assert!(c.score >= 70);
        let date = c.date.expect("dated path carries a date");
        prop_assert_eq!(date.year, year);
        prop_assert_eq!(date.month, month);
        prop_assert_eq!(date.day, day);
        prop_assert!(c.has_feature("date_based_url"));
    }

    #[test]
    fn classification_is_deterministic(path in "(/[a-z0-9-]{1,12}){0,4}/?") {
        let url = format!("https://example.com{}", path);
        let classifier = UrlClassifier::new();
        prop_assert_eq!(classifier.classify(&url), classifier.classify(&url));
        prop_assert_eq!(classify(&url), classifier.classify(&url));
    }

    #[test]
    fn score_is_bounded_and_recipes_clear_threshold(raw in ".{0,80}") {
        let c = classify(&raw);
        prop_assert!(c.score <= 100);
        if c.kind == UrlKind::Recipe {
            prop_assert!(c.score >= MIN_RECIPE_SCORE);
        }
    }

    #[test]
    fn keywords_alone_never_make_a_recipe(
        words in prop::collection::vec(
            prop::sample::select(vec!["chicken", "soup", "cake", "bread", "vegan", "easy"]),
            1..6,
        ),
    ) {
        // A single segment with no pattern: keyword points are capped below the threshold.
        let segment = words.join("");
        let c = classify(&format!("https://example.com/{}", segment));
        prop_assert_ne!(c.kind, UrlKind::Recipe);
    }

    #[test]
    fn frontier_claims_each_url_once(
        paths in prop::collection::vec("/[a-c]{1,3}/?(#[a-z]{1,3})?", 1..40),
    ) {
        let budget = CrawlBudget::new(1_000);
        let frontier = Frontier::new(budget.max_depth, budget.max_recipe_urls);
        let mut pushed = 0usize;
        for path in &paths {
            let c = classify(&format!("https://Example.com{}", path));
            let entry = FrontierEntry::new(c, 1, None).unwrap();
            match frontier.push(entry) {
                PushOutcome::Pushed => pushed += 1,
                PushOutcome::AlreadySeen => {}
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
        }

        let mut distinct: Vec<String> = paths
            .iter()
            .map(|p| p.split('#').next().unwrap_or("").trim_end_matches('/').to_string())
            .collect();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(pushed, distinct.len());
        prop_assert_eq!(frontier.len(), pushed);
    }
}
