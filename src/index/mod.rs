//! Search index forwarding
//!
//! Every persisted page is offered to an `Indexer`. Indexing is best
//! effort: the crawl never waits on or fails because of the index.

mod elasticsearch;

pub use elasticsearch::ElasticsearchIndexer;

use crate::config::{IndexerConfig, Language};
use crate::crawler::RetryPolicy;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while indexing
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Index returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Index rejected document: {0}")]
    Rejected(String),
}

impl IndexError {
    /// Errors worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            IndexError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            IndexError::Status { status, .. } => *status == 429 || *status >= 500,
            IndexError::Rejected(_) => false,
        }
    }
}

/// Document sent to the search index
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexDocument {
    pub url: String,
    /// Original page body
    pub content: String,
    pub processed_content: String,
    pub language: String,
    /// RFC 3339 time the page was fetched
    pub timestamp: String,
}

impl IndexDocument {
    pub fn new(url: &str, content: &str, processed_content: &str, language: Language) -> Self {
        Self {
            url: url.to_string(),
            content: content.to_string(),
            processed_content: processed_content.to_string(),
            language: language.as_str().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Destination for processed pages
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Indexes one document; a single attempt, retries are up to the caller
    async fn index(&self, document: &IndexDocument) -> Result<(), IndexError>;

    /// Prepares the destination; the default does nothing
    async fn prepare(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Indexer that drops every document
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndexer;

#[async_trait]
impl Indexer for NullIndexer {
    async fn index(&self, _document: &IndexDocument) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Builds the indexer described by configuration
pub fn build_indexer(config: &IndexerConfig) -> Result<Arc<dyn Indexer>, IndexError> {
    if !config.enabled {
        return Ok(Arc::new(NullIndexer));
    }
    Ok(Arc::new(ElasticsearchIndexer::new(
        &config.endpoint,
        &config.index,
    )?))
}

/// Retry policy for index writes
pub fn index_policy(config: &IndexerConfig) -> RetryPolicy<IndexError> {
    RetryPolicy::new(
        config.max_attempts,
        Duration::from_secs(1),
        IndexError::is_transient,
    )
}
