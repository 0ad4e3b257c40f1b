//! Crawl scheduler: the single-worker crawl loop
//!
//! The scheduler owns the [`CrawlSession`] and is the only writer of its
//! frontier, image registry and counters. Each step:
//! - checks for a stop request and the page limit
//! - dequeues one entry, marks it visited and fetches it
//! - extracts links and images from successful pages
//! - queues links one level deeper and registers images
//! - waits out the inter-request delay
//!
//! Observers hold a [`CrawlHandle`]: it can request a stop, read the latest
//! [`CrawlSnapshot`] and subscribe to the event log, but never touches the
//! session itself.

use super::extractor::{extract, CandidateKind};
use super::fetcher::{PageFetcher, PageResponse};
use super::frontier::{EnqueueOutcome, FrontierEntry};
use crate::config::{validate_settings, CrawlSettings};
use crate::images::ImageRegistry;
use crate::state::{CrawlEvent, CrawlSession, CrawlSnapshot, CrawlStatus};
use crate::url::{canonical_key, resolve_url, same_domain};
use crate::TrawlError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use url::Url;

/// Self-links on one page above which the page is reported as a link loop
pub const SELF_REFERENCE_WARNING_THRESHOLD: usize = 10;

/// Cloneable control surface for a running crawl
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    snapshots: watch::Receiver<CrawlSnapshot>,
    events: broadcast::Sender<CrawlEvent>,
}

impl CrawlHandle {
    /// Requests a cooperative stop
    ///
    /// The crawl loop notices the request at the top of its next step or
    /// while waiting between requests. A fetch already in flight completes,
    /// but its results are discarded. Has no effect unless a crawl is running.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Latest published progress
    pub fn snapshot(&self) -> CrawlSnapshot {
        *self.snapshots.borrow()
    }

    /// Receiver that is notified after every published change
    pub fn watch(&self) -> watch::Receiver<CrawlSnapshot> {
        self.snapshots.clone()
    }

    /// Live feed of new event log entries
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.events.subscribe()
    }
}

/// Sequential crawl loop over a page-fetch collaborator
pub struct CrawlScheduler<F> {
    fetcher: F,
    session: CrawlSession,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    snapshot_tx: watch::Sender<CrawlSnapshot>,
    snapshot_rx: watch::Receiver<CrawlSnapshot>,
}

impl<F: PageFetcher> CrawlScheduler<F> {
    pub fn new(fetcher: F) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (snapshot_tx, snapshot_rx) = watch::channel(CrawlSnapshot::default());

        Self {
            fetcher,
            session: CrawlSession::default(),
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            snapshot_tx,
            snapshot_rx,
        }
    }

    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle {
            stop_tx: Arc::clone(&self.stop_tx),
            snapshots: self.snapshot_rx.clone(),
            events: self.session.log.sender(),
        }
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    /// Image registry access for selection and retries
    pub fn images_mut(&mut self) -> &mut ImageRegistry {
        self.session.images_mut()
    }

    pub fn status(&self) -> CrawlStatus {
        self.session.status
    }

    pub fn snapshot(&self) -> CrawlSnapshot {
        self.session.snapshot()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn into_session(self) -> CrawlSession {
        self.session
    }

    /// Starts a new session from `seed`
    ///
    /// The seed and settings are both checked before any existing session
    /// state is touched, so a rejected start leaves the previous session
    /// intact.
    ///
    /// # Errors
    ///
    /// * `TrawlError::AlreadyRunning` - A crawl is in progress
    /// * `TrawlError::InvalidSeedUrl` - The seed is not an absolute http(s) URL
    /// * `TrawlError::Config` - A setting is out of range
    pub fn start(&mut self, seed: &str, settings: &CrawlSettings) -> Result<(), TrawlError> {
        if self.session.status.is_active() {
            return Err(TrawlError::AlreadyRunning);
        }

        let seed_url = resolve_url(seed, None).map_err(|e| TrawlError::InvalidSeedUrl {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;
        validate_settings(settings)?;

        // A stop requested before this start must not end the new session
        self.stop_tx.send_replace(false);
        self.stop_rx.borrow_and_update();

        self.session.reset(seed_url.clone(), settings.clone());
        self.session.transition(CrawlStatus::Running)?;
        self.session.frontier.enqueue(&seed_url, 1);

        self.session.log.info(
            format!(
                "Crawl started (max depth {}, max pages {}, external domains {})",
                settings.max_depth,
                settings.max_pages,
                if settings.include_external_domains {
                    "included"
                } else {
                    "excluded"
                }
            ),
            Some(seed_url.as_str()),
        );
        self.publish();
        Ok(())
    }

    /// Runs steps until the session leaves `Running`
    pub async fn run(&mut self) -> Result<CrawlStatus, TrawlError> {
        while self.session.status.is_active() {
            self.step().await?;
        }
        Ok(self.session.status)
    }

    /// Starts a session and runs it to the end
    pub async fn crawl(
        &mut self,
        seed: &str,
        settings: &CrawlSettings,
    ) -> Result<CrawlStatus, TrawlError> {
        self.start(seed, settings)?;
        self.run().await
    }

    /// Stops the running session immediately
    ///
    /// Pending entries are dropped; pages and images found so far are kept.
    /// Does nothing when no crawl is running.
    pub fn stop(&mut self) -> Result<(), TrawlError> {
        self.stop_tx.send_replace(true);
        if self.session.status.is_active() {
            self.halt()?;
        }
        Ok(())
    }

    /// Runs one iteration of the crawl loop
    ///
    /// Returns the session status after the step. Calling this on a session
    /// that is not running does nothing.
    pub async fn step(&mut self) -> Result<CrawlStatus, TrawlError> {
        if !self.session.status.is_active() {
            return Ok(self.session.status);
        }

        if self.stop_requested() {
            self.halt()?;
            return Ok(self.session.status);
        }

        let max_pages = self.session.settings.max_pages;
        if self.session.pages_visited >= max_pages {
            self.complete(&format!("page limit of {} reached", max_pages))?;
            return Ok(self.session.status);
        }

        let Some(entry) = self.session.frontier.dequeue() else {
            // Give late link discovery a moment before declaring the crawl done
            if self.pause(self.session.settings.settle_window()).await {
                self.halt()?;
            } else if self.session.frontier.is_empty() {
                self.complete("no pages left to visit")?;
            }
            return Ok(self.session.status);
        };

        self.session.frontier.mark_visited(&entry.key);
        self.session.record_visit(entry.depth);
        self.publish();

        tracing::debug!(
            "Fetching {} (depth {}, page {}/{})",
            entry.url,
            entry.depth,
            self.session.pages_visited,
            max_pages
        );

        let result = self.fetcher.fetch_page(&entry.url).await;

        if self.stop_requested() {
            tracing::debug!("Discarding in-flight result for {}", entry.url);
            self.halt()?;
            return Ok(self.session.status);
        }

        match result {
            Ok(response) if response.is_success() => self.process_page(&entry, response),
            Ok(response) => {
                self.session.pages_failed += 1;
                self.session.log.error(
                    format!("Page fetch failed: HTTP {}", response.status),
                    Some(entry.url.as_str()),
                );
            }
            Err(e) if e.is_fatal() => {
                self.session.pages_failed += 1;
                self.session
                    .log
                    .error(format!("Crawl failed: {}", e), Some(entry.url.as_str()));
                self.session.transition(CrawlStatus::Failed)?;
                self.publish();
                return Ok(self.session.status);
            }
            Err(e) => {
                self.session.pages_failed += 1;
                self.session
                    .log
                    .error(format!("Page fetch failed: {}", e), Some(entry.url.as_str()));
            }
        }

        self.publish();

        let more_to_do = self.session.pages_visited < max_pages && !self.session.frontier.is_empty();
        if more_to_do && self.pause(self.session.settings.delay()).await {
            self.halt()?;
        }

        Ok(self.session.status)
    }

    /// Feeds a fetched page through the extractor into frontier and registry
    fn process_page(&mut self, entry: &FrontierEntry, response: PageResponse) {
        let settings = self.session.settings.clone();
        let page_url = entry.url.as_str();
        let extracted = extract(&response.body, &response.final_url, &settings);

        // The redirect target is the same page; never fetch it a second time
        let final_key = canonical_key(&response.final_url);
        if final_key != entry.key {
            self.session.frontier.mark_visited(&final_key);
        }

        for rejected in &extracted.rejected {
            match rejected.kind {
                CandidateKind::Link => self.session.log.info(
                    format!("Skipped invalid link '{}': {}", rejected.raw, rejected.error),
                    Some(page_url),
                ),
                CandidateKind::Image => self.session.log.warning(
                    format!("Skipped invalid image '{}': {}", rejected.raw, rejected.error),
                    Some(page_url),
                ),
            }
        }

        if extracted.self_references >= SELF_REFERENCE_WARNING_THRESHOLD {
            self.session.log.warning(
                format!(
                    "Loop suppression: page links to itself {} times, self-links ignored",
                    extracted.self_references
                ),
                Some(page_url),
            );
        }

        let link_count = extracted.links.len();
        let new_images = self.session.images.register(extracted.images, page_url);

        let mut queued = 0;
        if entry.depth < settings.max_depth {
            for link in &extracted.links {
                if !settings.include_external_domains && !self.within_seed_domain(link) {
                    continue;
                }
                if self.session.frontier.enqueue_from(entry, link) == EnqueueOutcome::Queued {
                    queued += 1;
                }
            }

            if let Some(suppression) = self.session.frontier.suppress_loops() {
                self.session.log.warning(
                    format!(
                        "Loop suppression: trimmed queue from {} to {} entries ({} repeating URL patterns)",
                        suppression.before, suppression.after, suppression.patterns
                    ),
                    Some(page_url),
                );
            }
        }

        self.session.log.info(
            format!(
                "Visited page at depth {}: {} links, {} queued, {} new images",
                entry.depth, link_count, queued, new_images
            ),
            Some(page_url),
        );
    }

    fn within_seed_domain(&self, url: &Url) -> bool {
        self.session
            .seed
            .as_ref()
            .map_or(true, |seed| same_domain(seed, url))
    }

    fn complete(&mut self, reason: &str) -> Result<(), TrawlError> {
        self.session.transition(CrawlStatus::Completed)?;
        self.session.log.success(
            format!(
                "Crawl completed, {}: {} pages visited ({} failed), {} images found",
                reason,
                self.session.pages_visited,
                self.session.pages_failed,
                self.session.images.len()
            ),
            None,
        );
        self.publish();
        Ok(())
    }

    fn halt(&mut self) -> Result<(), TrawlError> {
        let dropped = self.session.frontier.clear_pending();
        self.session.transition(CrawlStatus::Stopped)?;
        self.session.log.warning(
            format!(
                "Crawl stopped: {} pages visited, {} queued pages dropped",
                self.session.pages_visited, dropped
            ),
            None,
        );
        self.publish();
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Sleeps for `duration` unless a stop arrives first
    ///
    /// Returns true if a stop was requested.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.stop_requested();
        }

        let mut stop_rx = self.stop_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.stop_requested(),
            _ = wait_for_stop(&mut stop_rx) => true,
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.session.snapshot());
    }
}

async fn wait_for_stop(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: no stop can ever arrive
            std::future::pending::<()>().await;
        }
    }
}
