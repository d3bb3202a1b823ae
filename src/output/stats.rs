//! Statistics from a project's on-disk state
//!
//! This module provides functionality for extracting and displaying
//! per-project crawl statistics and end-of-run summaries.

use crate::config::Project;
use crate::output::files::FileSink;
use crate::output::logs::count_entries;
use crate::output::traits::{ContentSink, CrawlSummary};
use crate::storage::{FileFrontierStore, FrontierStore};
use crate::SpiderError;

/// Crawl statistics of one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectStatistics {
    pub project: String,

    /// URLs waiting in the frontier
    pub queued: usize,

    /// URLs marked crawled
    pub crawled: usize,

    /// Original renditions at or above the minimum size
    pub persisted: usize,

    /// Entries in the block log
    pub blocked: usize,

    /// Entries in the error log
    pub errors: usize,
}

/// Loads statistics from a project's directory
///
/// A project that never ran reports all zeros and nothing is created on
/// disk.
///
/// # Arguments
///
/// * `project` - The project to inspect
/// * `min_file_size` - Size threshold for counting persisted pages
pub fn load_statistics(
    project: &Project,
    min_file_size: u64,
) -> Result<ProjectStatistics, SpiderError> {
    let mut stats = ProjectStatistics {
        project: project.name.clone(),
        ..Default::default()
    };

    if !project.queue_file().exists() && !project.crawled_file().exists() {
        return Ok(stats);
    }

    let frontier = FileFrontierStore::for_project(project).load()?;
    stats.queued = frontier.queued().len();
    stats.crawled = frontier.crawled().len();
    stats.persisted = FileSink::for_project(project, min_file_size).count_persisted()?;
    stats.blocked = count_entries(&project.blocked_log());
    stats.errors = count_entries(&project.error_log());

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ProjectStatistics) {
    println!("=== {} ===", stats.project);
    println!("  Queued:    {}", stats.queued);
    println!("  Crawled:   {}", stats.crawled);
    println!("  Persisted: {}", stats.persisted);
    println!("  Blocked:   {}", stats.blocked);
    println!("  Errors:    {}", stats.errors);

    let attempted = stats.crawled + stats.blocked + stats.errors;
    if attempted > 0 {
        let success_rate = (stats.crawled as f64 / attempted as f64) * 100.0;
        println!("  Success Rate: {:.1}%", success_rate);
    }
    println!();
}

/// Prints the summary of a finished run
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== {} ===", summary.project);
    println!(
        "  Crawled: {} / {} ({})",
        summary.crawled_count,
        summary.max_pages,
        if summary.budget_reached() {
            "budget reached"
        } else if summary.exhausted {
            "frontier exhausted"
        } else {
            "stopped"
        }
    );
    println!(
        "  Pages: {} succeeded, {} failed, {} blocked",
        summary.pages_succeeded, summary.pages_failed, summary.pages_blocked
    );
    println!("  Still queued: {}", summary.queued_remaining);
    if summary.removed_small_files > 0 {
        println!("  Removed small files: {}", summary.removed_small_files);
    }
    println!(
        "  Started: {}  Finished: {}  ({}s)",
        summary.started_at, summary.finished_at, summary.duration_seconds
    );
    println!();
}
