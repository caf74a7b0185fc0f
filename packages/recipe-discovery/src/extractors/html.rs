//! HTML link extraction with CSS selectors.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::traits::link_extractor::LinkExtractor;

const SKIPPED_PREFIXES: [&str; 4] = ["#", "mailto:", "tel:", "javascript:"];

/// Extracts `a[href]` links from HTML documents.
///
/// Links resolve against `<base href>` when the document declares one,
/// otherwise against the page URL. Only http(s) links survive, and each
/// appears once, in document order.
#[derive(Debug, Clone, Default)]
pub struct HtmlLinkExtractor;

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self
    }

    fn base_for(document: &Html, page_url: &Url) -> Url {
        let Ok(selector) = Selector::parse("base[href]") else {
            return page_url.clone();
        };
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| page_url.join(href.trim()).ok())
            .unwrap_or_else(|| page_url.clone())
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, html: &str, base_url: &str) -> Vec<String> {
        let Ok(page_url) = Url::parse(base_url) else {
            return Vec::new();
        };
        let Ok(link_selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        let document = Html::parse_document(html);
        let base = Self::base_for(&document, &page_url);

        let mut seen = HashSet::new();
        document
            .select(&link_selector)
            .filter_map(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|href| {
                !href.is_empty()
                    && !SKIPPED_PREFIXES
                        .iter()
                        .any(|p| href.to_ascii_lowercase().starts_with(p))
            })
            .filter_map(|href| base.join(href).ok())
            .filter(|url| url.scheme() == "http" || url.scheme() == "https")
            .map(|url| url.to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    fn name(&self) -> &str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_and_resolves_links() {
        let html = r##"
            <a href="/about">About</a>
            <a href="https://example.com/contact">Contact</a>
            <a href="#section">Anchor</a>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:me@example.com">Mail</a>
            <a href="tel:+15555555">Call</a>
            <a href="ftp://example.com/file">FTP</a>
            <a href="2023/05/01/banana-bread/">Relative</a>
        "##;

        let links = HtmlLinkExtractor::new().extract(html, "https://example.com/blog/");
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/contact",
                "https://example.com/blog/2023/05/01/banana-bread/",
            ]
        );
    }

    #[test]
    fn test_dedupes_preserving_order() {
        let html = r#"<a href="/b">b</a><a href="/a">a</a><a href="/b">b again</a>"#;
        let links = HtmlLinkExtractor::new().extract(html, "https://example.com/");
        assert_eq!(links, vec!["https://example.com/b", "https://example.com/a"]);
    }

    #[test]
    fn test_respects_base_href() {
        let html = r#"<html><head><base href="https://cdn.example.com/site/"></head>
            <body><a href="recipes/">Recipes</a></body></html>"#;
        let links = HtmlLinkExtractor::new().extract(html, "https://example.com/page");
        assert_eq!(links, vec!["https://cdn.example.com/site/recipes/"]);
    }

    #[test]
    fn test_bad_base_url_yields_nothing() {
        let links = HtmlLinkExtractor::new().extract(r#"<a href="/x">x</a>"#, "not a url");
        assert!(links.is_empty());
    }
}
