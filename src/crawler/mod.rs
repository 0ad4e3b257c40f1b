//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Page and image fetch collaborators (HTTP implementation with retries)
//! - Link and image extraction from page markup
//! - The frontier (visited set, breadth-first queue, loop suppression)
//! - The sequential crawl scheduler and its control handle

mod extractor;
mod fetcher;
mod frontier;
mod scheduler;

pub use extractor::{extract, CandidateKind, ExtractedPage, RejectedCandidate};
pub use fetcher::{
    build_http_client, thumbnail_fallback_chain, FetchError, HttpFetcher, ImageBytes,
    ImageFetcher, PageFetcher, PageResponse, THUMBNAIL_HOSTS, THUMBNAIL_VARIANTS,
};
pub use frontier::{
    EnqueueOutcome, Frontier, FrontierEntry, LoopSuppression, LOOP_PATTERN_MIN_SOURCES,
    LOOP_SUPPRESSION_THRESHOLD,
};
pub use scheduler::{CrawlHandle, CrawlScheduler, SELF_REFERENCE_WARNING_THRESHOLD};

use crate::config::Config;
use crate::state::CrawlSession;
use crate::TrawlError;

/// Runs a complete crawl with the HTTP fetcher
///
/// The seed comes from the configuration file. Returns the finished session
/// for reporting and image export.
///
/// # Example
///
/// ```no_run
/// use image_trawler::config::load_config;
/// use image_trawler::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let session = crawl(&config).await?;
/// println!("{} images found", session.images().len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config) -> Result<CrawlSession, TrawlError> {
    let seed = config.seed.as_deref().ok_or_else(|| TrawlError::InvalidSeedUrl {
        url: String::new(),
        reason: "no seed URL configured".to_string(),
    })?;

    let fetcher = HttpFetcher::new(&config.fetcher)?;
    let mut scheduler = CrawlScheduler::new(fetcher);
    scheduler.crawl(seed, &config.crawler).await?;
    Ok(scheduler.into_session())
}
