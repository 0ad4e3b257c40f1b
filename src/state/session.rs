//! State of one crawl session

use super::{CrawlStatus, EventLog};
use crate::config::CrawlSettings;
use crate::crawler::Frontier;
use crate::images::ImageRegistry;
use crate::TrawlError;
use chrono::{DateTime, Utc};
use url::Url;

/// Progress counters published to observers after every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlSnapshot {
    pub status: CrawlStatus,
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub images_found: usize,
    pub max_depth_reached: u32,
    pub queue_length: usize,
    pub running: bool,
}

/// Everything a crawl accumulates between two starts
///
/// A session is owned by its scheduler. Observers get read access through
/// the scheduler, or copies of [`CrawlSnapshot`] through a handle.
#[derive(Debug)]
pub struct CrawlSession {
    pub(crate) seed: Option<Url>,
    pub(crate) settings: CrawlSettings,
    pub(crate) frontier: Frontier,
    pub(crate) images: ImageRegistry,
    pub(crate) pages_visited: u32,
    pub(crate) pages_failed: u32,
    pub(crate) max_depth_reached: u32,
    pub(crate) status: CrawlStatus,
    pub(crate) log: EventLog,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl Default for CrawlSession {
    fn default() -> Self {
        Self::new(CrawlSettings::default())
    }
}

impl CrawlSession {
    pub fn new(settings: CrawlSettings) -> Self {
        Self {
            seed: None,
            frontier: Frontier::new(settings.max_depth),
            images: ImageRegistry::new(settings.max_image_retries),
            settings,
            pages_visited: 0,
            pages_failed: 0,
            max_depth_reached: 0,
            status: CrawlStatus::Idle,
            log: EventLog::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn seed(&self) -> Option<&Url> {
        self.seed.as_ref()
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }

    /// Mutable registry access for selection and image retries
    pub fn images_mut(&mut self) -> &mut ImageRegistry {
        &mut self.images
    }

    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    pub fn pages_failed(&self) -> u32 {
        self.pages_failed
    }

    pub fn max_depth_reached(&self) -> u32 {
        self.max_depth_reached
    }

    pub fn status(&self) -> CrawlStatus {
        self.status
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Wall-clock duration of the crawl, or of the running part so far
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        Some(self.finished_at.unwrap_or_else(Utc::now) - started)
    }

    pub fn snapshot(&self) -> CrawlSnapshot {
        CrawlSnapshot {
            status: self.status,
            pages_visited: self.pages_visited,
            pages_failed: self.pages_failed,
            images_found: self.images.len(),
            max_depth_reached: self.max_depth_reached,
            queue_length: self.frontier.len(),
            running: self.status.is_active(),
        }
    }

    /// Clears all accumulated state for a new crawl
    ///
    /// The event log keeps its live subscribers.
    pub(crate) fn reset(&mut self, seed: Url, settings: CrawlSettings) {
        self.frontier = Frontier::new(settings.max_depth);
        self.images = ImageRegistry::new(settings.max_image_retries);
        self.seed = Some(seed);
        self.settings = settings;
        self.pages_visited = 0;
        self.pages_failed = 0;
        self.max_depth_reached = 0;
        self.log.clear();
        self.started_at = None;
        self.finished_at = None;
    }

    /// Moves the session to `next`, stamping start and finish times
    pub(crate) fn transition(&mut self, next: CrawlStatus) -> Result<(), TrawlError> {
        if !self.status.can_transition_to(next) {
            return Err(TrawlError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        tracing::debug!("Session {} -> {}", self.status, next);
        self.status = next;

        if next == CrawlStatus::Running {
            self.started_at = Some(Utc::now());
            self.finished_at = None;
        } else if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }

        Ok(())
    }

    /// Records a visited page and the depth it was found at
    pub(crate) fn record_visit(&mut self, depth: u32) {
        self.pages_visited += 1;
        self.max_depth_reached = self.max_depth_reached.max(depth);
    }
}
