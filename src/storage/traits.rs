//! Storage traits and error types
//!
//! This module defines the trait interface for frontier backends and
//! associated error types.

use crate::storage::FrontierState;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during frontier storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home of one project's queued and crawled sets
///
/// Implementations must never leave a half-written copy behind: a failed
/// `save` keeps the previous durable state readable.
pub trait FrontierStore: Send + Sync {
    /// Reads both sets, creating them (homepage queued, nothing crawled)
    /// when the backing store does not exist yet
    fn load(&self) -> StorageResult<FrontierState>;

    /// Reads only the queued set from durable storage
    fn load_queued(&self) -> StorageResult<HashSet<String>>;

    /// Replaces the durable copy with `state`
    fn save(&self, state: &FrontierState) -> StorageResult<()>;

    /// Deletes the durable copy so the next `load` starts from the seed
    fn reset(&self) -> StorageResult<()>;
}
