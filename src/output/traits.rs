//! Content sink trait and types
//!
//! This module defines the trait interface for persisting page content and
//! the summary produced at the end of a project's run.

use crate::config::Language;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Which rendition of a page is being persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// The raw page body
    Original,

    /// Text after language processing
    Processed(Language),
}

impl ContentKind {
    /// Filename suffix, without the `.txt` extension
    pub fn suffix(&self) -> &'static str {
        match self {
            ContentKind::Original => "org",
            ContentKind::Processed(language) => language.processed_suffix(),
        }
    }
}

/// Trait for content sinks
///
/// A sink owns the persisted renditions of every page of one project.
/// Writing the same URL twice overwrites the earlier copy.
pub trait ContentSink: Send + Sync {
    /// Persists one rendition of a page and returns where it went
    fn write(&self, url: &str, content: &str, kind: ContentKind) -> OutputResult<PathBuf>;

    /// Counts original renditions that are at least the minimum size
    fn count_persisted(&self) -> OutputResult<usize>;

    /// Deletes pages whose original is below the minimum size, together
    /// with their processed rendition; returns how many files went
    fn clean_small_files(&self) -> OutputResult<usize>;
}

/// Summary of one project's run
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub project: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_seconds: u64,

    /// Persisted pages counted against the budget
    pub crawled_count: usize,
    pub max_pages: usize,

    pub pages_succeeded: usize,
    pub pages_failed: usize,
    pub pages_blocked: usize,

    /// URLs still queued when the run ended
    pub queued_remaining: usize,

    /// True if the run ended because nothing was left to crawl
    pub exhausted: bool,

    /// Small files removed by the cleanup pass
    pub removed_small_files: usize,
}

impl CrawlSummary {
    pub fn budget_reached(&self) -> bool {
        self.crawled_count >= self.max_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_suffix() {
        assert_eq!(ContentKind::Original.suffix(), "org");
        assert_eq!(ContentKind::Processed(Language::En).suffix(), "e");
        assert_eq!(ContentKind::Processed(Language::Cn).suffix(), "c");
    }

    #[test]
    fn test_summary_budget() {
        let summary = CrawlSummary {
            crawled_count: 10,
            max_pages: 10,
            ..Default::default()
        };
        assert!(summary.budget_reached());
    }
}
