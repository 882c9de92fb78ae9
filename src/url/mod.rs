//! URL handling module for Sumi-Roster
//!
//! This module provides URL normalization, domain extraction, and the link
//! relationship heuristics used to rank candidate links during discovery.

mod domain;
mod normalize;
mod relationship;

// Re-export main functions
pub use domain::{extract_domain, same_domain_or_subdomain};
pub use normalize::{normalize, NormalizedUrl};
pub use relationship::{
    exclude_url, filter_children, filter_siblings, is_child, is_sibling, LISTING_KEYWORDS,
};
