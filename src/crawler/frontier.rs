//! Crawl frontier: visited set and pending queue
//!
//! The frontier decides what gets fetched and in which order:
//! - FIFO pending queue, so pages are crawled breadth-first
//! - visited set keyed by canonical URL; a visited key is never queued again
//! - depth bound enforced at enqueue time
//! - loop suppression for pathological near-duplicate link growth

use crate::url::canonical_key;
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// Queue length above which loop suppression starts looking at the queue
pub const LOOP_SUPPRESSION_THRESHOLD: usize = 10;

/// Pages of one pattern that must queue more of that pattern before it is
/// treated as a loop
pub const LOOP_PATTERN_MIN_SOURCES: usize = 3;

/// A URL waiting to be fetched
///
/// Entries are values identified only by their key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical key (see [`canonical_key`])
    pub key: String,

    /// Address to fetch
    pub url: Url,

    /// Link hops from the seed; the seed is depth 1
    pub depth: u32,
}

/// Result of an enqueue request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    AlreadyVisited,
    AlreadyPending,
    DepthOutOfRange,
}

/// What loop suppression did to the pending queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSuppression {
    pub before: usize,
    pub after: usize,

    /// Number of looping patterns that were collapsed
    pub patterns: usize,
}

/// Visited set plus breadth-first pending queue
#[derive(Debug, Clone)]
pub struct Frontier {
    max_depth: u32,
    visited: HashSet<String>,
    pending: VecDeque<FrontierEntry>,
    pending_keys: HashSet<String>,

    /// Per pattern, the pages of that same pattern that queued new entries of it
    growth: HashMap<String, HashSet<String>>,
}

impl Frontier {
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            visited: HashSet::new(),
            pending: VecDeque::new(),
            pending_keys: HashSet::new(),
            growth: HashMap::new(),
        }
    }

    /// Queues a URL at the given depth
    ///
    /// No-op when the canonical key is already visited or pending, or when the
    /// depth is outside `1..=max_depth`.
    pub fn enqueue(&mut self, url: &Url, depth: u32) -> EnqueueOutcome {
        if depth == 0 || depth > self.max_depth {
            return EnqueueOutcome::DepthOutOfRange;
        }

        let key = canonical_key(url);
        if self.visited.contains(&key) {
            return EnqueueOutcome::AlreadyVisited;
        }
        if !self.pending_keys.insert(key.clone()) {
            return EnqueueOutcome::AlreadyPending;
        }

        let mut url = url.clone();
        url.set_fragment(None);

        tracing::trace!("Queued {} at depth {}", key, depth);
        self.pending.push_back(FrontierEntry { key, url, depth });
        EnqueueOutcome::Queued
    }

    /// Queues a link discovered on `parent`, one hop deeper
    ///
    /// Links sharing the parent's pattern are tracked so that suppression can
    /// tell a self-feeding pattern from a page that merely lists many siblings.
    pub fn enqueue_from(&mut self, parent: &FrontierEntry, url: &Url) -> EnqueueOutcome {
        let outcome = self.enqueue(url, parent.depth + 1);
        if outcome == EnqueueOutcome::Queued {
            let parent_pattern = pattern(&parent.key);
            let queued = self.pending.back().map(|e| pattern(&e.key));
            if queued == Some(parent_pattern) {
                self.growth
                    .entry(parent_pattern.to_string())
                    .or_default()
                    .insert(parent.key.clone());
            }
        }
        outcome
    }

    /// Whether pages of this pattern keep queueing more of it
    pub fn is_looping_pattern(&self, key: &str) -> bool {
        self.growth
            .get(pattern(key))
            .is_some_and(|sources| sources.len() >= LOOP_PATTERN_MIN_SOURCES)
    }

    /// Pops the oldest pending entry
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        let entry = self.pending.pop_front()?;
        self.pending_keys.remove(&entry.key);
        Some(entry)
    }

    /// Records a key as visited
    ///
    /// Called before the page is fetched so the in-flight URL can never be
    /// queued again. A pending entry with the same key is dropped. Returns
    /// false if the key was already visited.
    pub fn mark_visited(&mut self, key: &str) -> bool {
        if self.pending_keys.remove(key) {
            self.pending.retain(|e| e.key != key);
        }
        self.visited.insert(key.to_string())
    }

    pub fn is_visited(&self, key: &str) -> bool {
        self.visited.contains(key)
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending_keys.contains(key)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Pending entries in crawl order
    pub fn pending(&self) -> impl Iterator<Item = &FrontierEntry> {
        self.pending.iter()
    }

    /// Drops every pending entry; the visited set is kept
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.pending_keys.clear();
        dropped
    }

    /// Trims the pending queue when it fills up with near-duplicates
    ///
    /// Entries are compared by pattern: the canonical key without its query
    /// string, so `/calendar?day=1` and `/calendar?day=2` match. Suppression
    /// applies once the queue holds more than [`LOOP_SUPPRESSION_THRESHOLD`]
    /// entries and fewer than half of them have distinct patterns. Only
    /// looping patterns (see [`Frontier::is_looping_pattern`]) are trimmed,
    /// each down to its first entry, so the queue is never emptied.
    ///
    /// This bounds frontier growth on self-referential sites; it is a
    /// heuristic, not a guarantee.
    pub fn suppress_loops(&mut self) -> Option<LoopSuppression> {
        let before = self.pending.len();
        if before <= LOOP_SUPPRESSION_THRESHOLD {
            return None;
        }

        let unique = self
            .pending
            .iter()
            .map(|e| pattern(&e.key))
            .collect::<HashSet<_>>()
            .len();
        if unique * 2 >= before {
            return None;
        }

        let looping: HashSet<String> = self
            .pending
            .iter()
            .filter(|e| self.is_looping_pattern(&e.key))
            .map(|e| pattern(&e.key).to_string())
            .collect();
        if looping.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        self.pending.retain(|entry| {
            let p = pattern(&entry.key);
            !looping.contains(p) || seen.insert(p.to_string())
        });
        self.pending_keys = self.pending.iter().map(|e| e.key.clone()).collect();

        let after = self.pending.len();
        if after == before {
            return None;
        }

        Some(LoopSuppression {
            before,
            after,
            patterns: looping.len(),
        })
    }
}

/// Canonical key with the query string removed
fn pattern(key: &str) -> &str {
    key.split_once('?').map_or(key, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_enqueue_and_dequeue_fifo() {
        let mut frontier = Frontier::new(3);
        frontier.enqueue(&url("https://example.com/a"), 2);
        frontier.enqueue(&url("https://example.com/b"), 2);
        frontier.enqueue(&url("https://example.com/c"), 3);

        let order: Vec<String> = std::iter::from_fn(|| frontier.dequeue())
            .map(|e| e.key)
            .collect();
        assert_eq!(
            order,
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c",
            ]
        );
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn test_enqueue_normalizes_and_dedups_pending() {
        let mut frontier = Frontier::new(3);
        assert_eq!(
            frontier.enqueue(&url("https://example.com/Page/"), 2),
            EnqueueOutcome::Queued
        );
        assert_eq!(
            frontier.enqueue(&url("https://EXAMPLE.com/page#top"), 2),
            EnqueueOutcome::AlreadyPending
        );
        assert_eq!(frontier.len(), 1);

        let entry = frontier.dequeue().unwrap();
        assert_eq!(entry.key, "https://example.com/page");
        assert_eq!(entry.url.as_str(), "https://example.com/Page/");
    }

    #[test]
    fn test_visited_urls_never_requeued() {
        let mut frontier = Frontier::new(3);
        frontier.enqueue(&url("https://example.com/a"), 1);
        let entry = frontier.dequeue().unwrap();
        assert!(frontier.mark_visited(&entry.key));
        assert!(!frontier.mark_visited(&entry.key));

        assert_eq!(
            frontier.enqueue(&url("https://example.com/a/"), 2),
            EnqueueOutcome::AlreadyVisited
        );
        assert!(frontier.is_empty());
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_mark_visited_drops_pending_entry() {
        let mut frontier = Frontier::new(3);
        frontier.enqueue(&url("https://example.com/old"), 2);
        frontier.enqueue(&url("https://example.com/new"), 2);

        assert!(frontier.mark_visited("https://example.com/new"));
        assert!(!frontier.is_pending("https://example.com/new"));
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.dequeue().unwrap().key, "https://example.com/old");
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn test_depth_bound() {
        let mut frontier = Frontier::new(2);
        assert_eq!(
            frontier.enqueue(&url("https://example.com/deep"), 3),
            EnqueueOutcome::DepthOutOfRange
        );
        assert_eq!(
            frontier.enqueue(&url("https://example.com/zero"), 0),
            EnqueueOutcome::DepthOutOfRange
        );
        assert_eq!(
            frontier.enqueue(&url("https://example.com/ok"), 2),
            EnqueueOutcome::Queued
        );
        assert!(frontier.pending().all(|e| e.depth <= frontier.max_depth()));
    }

    #[test]
    fn test_clear_pending_keeps_visited() {
        let mut frontier = Frontier::new(2);
        frontier.mark_visited("https://example.com");
        frontier.enqueue(&url("https://example.com/a"), 2);
        frontier.enqueue(&url("https://example.com/b"), 2);

        assert_eq!(frontier.clear_pending(), 2);
        assert!(frontier.is_empty());
        assert!(!frontier.is_pending("https://example.com/a"));
        assert!(frontier.is_visited("https://example.com"));
    }

    #[test]
    fn test_no_suppression_below_threshold() {
        let mut frontier = Frontier::new(2);
        for i in 0..LOOP_SUPPRESSION_THRESHOLD {
            frontier.enqueue(&url(&format!("https://example.com/cal?day={}", i)), 2);
        }
        assert_eq!(frontier.suppress_loops(), None);
        assert_eq!(frontier.len(), LOOP_SUPPRESSION_THRESHOLD);
    }

    #[test]
    fn test_no_suppression_for_distinct_pages() {
        let mut frontier = Frontier::new(2);
        for i in 0..20 {
            frontier.enqueue(&url(&format!("https://example.com/post-{}", i)), 2);
        }
        assert_eq!(frontier.suppress_loops(), None);
        assert_eq!(frontier.len(), 20);
    }

    fn entry(key: &str, depth: u32) -> FrontierEntry {
        FrontierEntry {
            key: key.to_string(),
            url: url(key),
            depth,
        }
    }

    #[test]
    fn test_sibling_query_pages_are_kept() {
        // One index page listing many articles is not a loop
        let mut frontier = Frontier::new(3);
        let index = entry("https://example.com/index.php", 1);
        for i in 1..=12 {
            let link = url(&format!("https://example.com/index.php?article={}", i));
            assert_eq!(frontier.enqueue_from(&index, &link), EnqueueOutcome::Queued);
        }

        assert!(!frontier.is_looping_pattern("https://example.com/index.php"));
        assert_eq!(frontier.suppress_loops(), None);
        assert_eq!(frontier.len(), 12);
    }

    #[test]
    fn test_looping_pattern_trimmed_to_first_entry() {
        let mut frontier = Frontier::new(5);
        let mut day = 0;
        for source in 0..LOOP_PATTERN_MIN_SOURCES {
            let parent = entry(&format!("https://example.com/cal?page={}", source), 2);
            for _ in 0..5 {
                let link = url(&format!("https://example.com/cal?day={}", day));
                frontier.enqueue_from(&parent, &link);
                day += 1;
            }
        }
        frontier.enqueue(&url("https://example.com/about"), 2);

        assert!(frontier.is_looping_pattern("https://example.com/cal?day=3"));
        let suppression = frontier.suppress_loops().unwrap();
        assert_eq!(suppression.before, 16);
        assert_eq!(suppression.after, 2);
        assert_eq!(suppression.patterns, 1);

        let keys: Vec<&str> = frontier.pending().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["https://example.com/cal?day=0", "https://example.com/about"]
        );

        // Trimmed entries may be queued again later
        assert_eq!(
            frontier.enqueue(&url("https://example.com/cal?day=5"), 2),
            EnqueueOutcome::Queued
        );
    }

    #[test]
    fn test_suppression_never_empties_queue() {
        let mut frontier = Frontier::new(5);
        for source in 0..5 {
            let parent = entry(&format!("https://example.com/tag?t={}", source), 2);
            for i in 0..4 {
                let link = url(&format!("https://example.com/tag?t={}-{}", source, i));
                frontier.enqueue_from(&parent, &link);
            }
        }

        let suppression = frontier.suppress_loops().unwrap();
        assert_eq!(suppression.before, 20);
        assert_eq!(suppression.after, 1);
        assert!(!frontier.is_empty());
    }

    #[test]
    fn test_links_to_other_patterns_do_not_count_as_growth() {
        let mut frontier = Frontier::new(3);
        for source in 0..5 {
            let parent = entry(&format!("https://example.com/post-{}", source), 2);
            let link = url(&format!("https://example.com/cal?day={}", source));
            frontier.enqueue_from(&parent, &link);
        }
        assert!(!frontier.is_looping_pattern("https://example.com/cal"));
    }
}
