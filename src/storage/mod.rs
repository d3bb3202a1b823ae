//! Storage module for persisting crawl frontiers
//!
//! This module handles the durable side of a project's frontier:
//! - The in-memory `FrontierState` with its disjoint queued/crawled sets
//! - The `FrontierStore` trait for durable backends
//! - The newline-delimited file backend used by every project

mod files;
mod frontier;
mod traits;

pub use files::FileFrontierStore;
pub use frontier::FrontierState;
pub use traits::{FrontierStore, StorageError, StorageResult};

use crate::config::Project;

/// Opens the file-backed frontier store for a project
pub fn open_store(project: &Project) -> FileFrontierStore {
    FileFrontierStore::for_project(project)
}
