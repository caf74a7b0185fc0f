//! Fetch strategy: which fetcher to use for a URL, and when to escalate.

pub mod selector;
pub mod soft_block;

pub use selector::FetchStrategySelector;
pub use soft_block::{SoftBlock, SoftBlockDetector};
