//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Building a summary of a finished session
//! - Printing crawl statistics to the console
//! - Writing a Markdown report

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::print_summary;
pub use summary::SessionSummary;
