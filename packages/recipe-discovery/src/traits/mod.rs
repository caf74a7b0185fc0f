//! Core trait abstractions for recipe discovery.
//!
//! These traits define the seams where applications plug in page
//! retrieval and link extraction.

pub mod fetcher;
pub mod link_extractor;
