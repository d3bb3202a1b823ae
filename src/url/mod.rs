//! URL handling module for Craft-Spider
//!
//! This module provides URL normalization, domain extraction and the
//! same-site boundary used to keep a crawl inside one website.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, is_same_domain, registrable_domain};
pub use normalize::normalize_url;
