//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStatus`: lifecycle of a crawl session (idle, running, completed, stopped, failed)
//! - `CrawlSession`: frontier, image registry, counters and event log of one crawl
//! - `EventLog`: timestamped, severity-tagged user-facing events

mod events;
mod session;
mod status;

// Re-export main types
pub use events::{CrawlEvent, EventLog, Severity};
pub use session::{CrawlSession, CrawlSnapshot};
pub use status::CrawlStatus;
