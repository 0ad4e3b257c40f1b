/// Crawl session status and its transition rules
use std::fmt;

/// Lifecycle state of a crawl session
///
/// `Idle` is the only initial state. `Completed`, `Stopped` and `Failed` are
/// terminal; a terminal session can only leave its state through a new start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrawlStatus {
    // ===== Initial State =====
    /// No crawl has been started
    #[default]
    Idle,

    // ===== Active State =====
    /// Pages are being fetched
    Running,

    // ===== Terminal States =====
    /// The frontier was exhausted or the page limit was reached
    Completed,

    /// A stop was requested by the caller
    Stopped,

    /// The fetch collaborator failed in a way the crawl cannot recover from
    Failed,
}

impl CrawlStatus {
    /// Returns true for `Completed`, `Stopped` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }

    /// Returns true while the crawl loop is running
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if the session may move from `self` to `next`
    ///
    /// Any non-running state may start a new crawl; a running crawl may only
    /// end in one of the terminal states.
    pub fn can_transition_to(&self, next: CrawlStatus) -> bool {
        match (self, next) {
            (Self::Running, Self::Completed | Self::Stopped | Self::Failed) => true,
            (Self::Running, _) => false,
            (_, Self::Running) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 5] {
        [
            Self::Idle,
            Self::Running,
            Self::Completed,
            Self::Stopped,
            Self::Failed,
        ]
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
