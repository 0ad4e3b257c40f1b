//! URL handling module for Image-Trawler
//!
//! This module resolves raw hrefs against their page, reduces URLs to the
//! canonical keys used by the frontier, and compares hosts for domain scoping.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_domain};
pub use normalize::{canonical_key, normalize_url, resolve_url};
