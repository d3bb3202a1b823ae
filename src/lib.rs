//! Craft-Spider: a concurrent, resumable site crawler
//!
//! This crate crawls one or more websites concurrently, keeps a durable
//! per-project frontier of queued and crawled URLs, stores original and
//! processed page content on disk, and forwards documents to a search index.

pub mod config;
pub mod crawler;
pub mod index;
pub mod output;
pub mod process;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Craft-Spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frontier storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Content sink error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Craft-Spider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, Language, Project};
pub use crawler::{Coordinator, Spider};
pub use state::PageState;
pub use url::{extract_domain, normalize_url, registrable_domain};
