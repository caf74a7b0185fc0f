//! Data types for recipe discovery.

pub mod classification;
pub mod config;
pub mod page;
pub mod site;
pub mod stats;
