//! Output module for persisted content, crawl logs and summaries
//!
//! This module handles:
//! - Writing original and processed page renditions to disk
//! - Appending blocked and failed URLs to per-project logs
//! - Reporting per-project statistics and run summaries

mod files;
mod logs;
pub mod stats;
mod traits;

pub use files::{file_stem, FileSink};
pub use logs::{count_entries, CrawlLog};
pub use stats::{load_statistics, print_statistics, print_summary, ProjectStatistics};
pub use traits::{ContentKind, ContentSink, CrawlSummary, OutputError, OutputResult};

use crate::config::Project;

/// Opens the filesystem sink for a project
pub fn open_sink(project: &Project, min_file_size: u64) -> FileSink {
    FileSink::for_project(project, min_file_size)
}
