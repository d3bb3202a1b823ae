//! In-memory frontier: the queued and crawled URL sets of one project

use std::collections::HashSet;

/// Queued and crawled URL sets
///
/// The two sets are kept disjoint, and a URL that reached `crawled` is
/// never queued again. All mutation goes through the methods below so the
/// invariant cannot be broken by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontierState {
    queued: HashSet<String>,
    crawled: HashSet<String>,
}

impl FrontierState {
    /// A fresh frontier holding only the seed URL
    pub fn seeded(seed: &str) -> Self {
        let mut queued = HashSet::new();
        queued.insert(seed.to_string());
        Self {
            queued,
            crawled: HashSet::new(),
        }
    }

    /// Builds a frontier from raw sets, e.g. hand-edited files
    ///
    /// URLs present in both sets are treated as crawled.
    pub fn from_sets(mut queued: HashSet<String>, crawled: HashSet<String>) -> Self {
        queued.retain(|url| !crawled.contains(url));
        Self { queued, crawled }
    }

    pub fn queued(&self) -> &HashSet<String> {
        &self.queued
    }

    pub fn crawled(&self) -> &HashSet<String> {
        &self.crawled
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.queued.contains(url)
    }

    pub fn is_crawled(&self, url: &str) -> bool {
        self.crawled.contains(url)
    }

    /// Adds `url` to the queue unless it is already queued or crawled
    ///
    /// Returns true if the queue grew.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.crawled.contains(url) {
            return false;
        }
        self.queued.insert(url.to_string())
    }

    /// Moves `url` from queued to crawled
    ///
    /// Returns false if it was already crawled.
    pub fn mark_crawled(&mut self, url: &str) -> bool {
        self.queued.remove(url);
        self.crawled.insert(url.to_string())
    }

    /// Drops `url` from the queue without marking it crawled
    pub fn drop_queued(&mut self, url: &str) -> bool {
        self.queued.remove(url)
    }

    /// Stops further discovery by emptying the queue
    pub fn clear_queued(&mut self) {
        self.queued.clear();
    }

    /// True when no URL is both queued and crawled
    pub fn is_disjoint(&self) -> bool {
        self.queued.is_disjoint(&self.crawled)
    }
}
