//! Link extractor implementations.

pub mod html;

pub use html::HtmlLinkExtractor;
