//! User-facing crawl event log
//!
//! Every notable crawl event is appended to the session log, mirrored to
//! `tracing` at a matching level, and broadcast to live subscribers.

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::broadcast;

/// Capacity of the live event channel; slow subscribers see `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Severity of a crawl event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the session log
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,

    /// Page or image the event is about, if any
    pub url: Option<String>,
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.severity,
            self.message
        )?;
        if let Some(url) = &self.url {
            write!(f, " ({})", url)?;
        }
        Ok(())
    }
}

/// Append-only event log with a live broadcast channel
#[derive(Debug)]
pub struct EventLog {
    entries: Vec<CrawlEvent>,
    tx: broadcast::Sender<CrawlEvent>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Vec::new(),
            tx,
        }
    }

    /// Appends an event
    ///
    /// Sending never blocks; with no live subscribers the event is only kept
    /// in the log.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>, url: Option<&str>) {
        let event = CrawlEvent {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            url: url.map(str::to_string),
        };

        let target = event.url.as_deref().unwrap_or("-");
        match severity {
            Severity::Info | Severity::Success => tracing::info!("{} [{}]", event.message, target),
            Severity::Warning => tracing::warn!("{} [{}]", event.message, target),
            Severity::Error => tracing::error!("{} [{}]", event.message, target),
        }

        let _ = self.tx.send(event.clone());
        self.entries.push(event);
    }

    pub fn info(&mut self, message: impl Into<String>, url: Option<&str>) {
        self.push(Severity::Info, message, url);
    }

    pub fn success(&mut self, message: impl Into<String>, url: Option<&str>) {
        self.push(Severity::Success, message, url);
    }

    pub fn warning(&mut self, message: impl Into<String>, url: Option<&str>) {
        self.push(Severity::Warning, message, url);
    }

    pub fn error(&mut self, message: impl Into<String>, url: Option<&str>) {
        self.push(Severity::Error, message, url);
    }

    pub fn entries(&self) -> &[CrawlEvent] {
        &self.entries
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &CrawlEvent> {
        self.entries.iter().filter(move |e| e.severity == severity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the log; live subscribers stay attached
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sender half of the live channel, for handing out new subscriptions
    pub fn sender(&self) -> broadcast::Sender<CrawlEvent> {
        self.tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.tx.subscribe()
    }
}
