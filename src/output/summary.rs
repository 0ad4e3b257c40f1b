//! Summary of a finished crawl session

use crate::images::{ImageRecord, ImageType};
use crate::state::{CrawlEvent, CrawlSession, CrawlStatus, Severity};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Everything the console and Markdown reports show about a session
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    // Session metadata
    pub seed: Option<String>,
    pub status: CrawlStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub config_hash: Option<String>,

    // Page counters
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub max_depth_reached: u32,
    pub queue_length: usize,

    // Image counters
    pub images_found: usize,
    pub images_selected: usize,
    pub images_by_type: BTreeMap<ImageType, usize>,

    /// Type the image listing is restricted to, if any
    pub filter: Option<ImageType>,

    /// Image listing, after `filter`
    pub images: Vec<ImageRecord>,

    /// URLs of images whose last load failed
    pub failed_images: Vec<String>,

    // Notable log entries
    pub warnings: Vec<CrawlEvent>,
    pub errors: Vec<CrawlEvent>,
}

impl SessionSummary {
    /// Builds a summary from a session
    ///
    /// # Arguments
    ///
    /// * `session` - The crawl session, usually finished
    /// * `filter` - Restricts the image listing to one type; counters are unaffected
    /// * `config_hash` - Fingerprint of the configuration file, if one was used
    pub fn from_session(
        session: &CrawlSession,
        filter: Option<ImageType>,
        config_hash: Option<String>,
    ) -> Self {
        let images = session.images();
        let log = session.log();

        Self {
            seed: session.seed().map(|url| url.to_string()),
            status: session.status(),
            started_at: session.started_at(),
            finished_at: session.finished_at(),
            duration_seconds: session.elapsed().map(|d| d.num_seconds()),
            config_hash,
            pages_visited: session.pages_visited(),
            pages_failed: session.pages_failed(),
            max_depth_reached: session.max_depth_reached(),
            queue_length: session.frontier().len(),
            images_found: images.len(),
            images_selected: images.selected().count(),
            images_by_type: images.counts_by_type(),
            filter,
            images: images.filter_by_type(filter).into_iter().cloned().collect(),
            failed_images: images.failed().map(|r| r.url.clone()).collect(),
            warnings: log.with_severity(Severity::Warning).cloned().collect(),
            errors: log.with_severity(Severity::Error).cloned().collect(),
        }
    }

    /// Share of visited pages that were fetched successfully, in percent
    pub fn success_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            return 0.0;
        }
        let succeeded = self.pages_visited.saturating_sub(self.pages_failed);
        (succeeded as f64 / self.pages_visited as f64) * 100.0
    }
}
