//! Elasticsearch indexer over its REST API

use crate::index::{IndexDocument, IndexError, Indexer};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Indexes documents with `POST /<index>/_doc`
#[derive(Debug, Clone)]
pub struct ElasticsearchIndexer {
    client: Client,
    endpoint: String,
    index: String,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    result: Option<String>,
}

impl ElasticsearchIndexer {
    pub fn new(endpoint: &str, index: &str) -> Result<Self, IndexError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::with_client(client, endpoint, index))
    }

    pub fn with_client(client: Client, endpoint: &str, index: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index: index.to_string(),
        }
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.index)
    }

    /// Mapping used when the index has to be created
    fn mapping() -> serde_json::Value {
        let text_with_keyword = json!({
            "type": "text",
            "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
        });

        json!({
            "mappings": {
                "properties": {
                    "url": text_with_keyword,
                    "content": text_with_keyword,
                    "processed_content": text_with_keyword,
                    "language": text_with_keyword,
                    "timestamp": { "type": "date" }
                }
            },
            "settings": {
                "index": {
                    "analyze": { "max_token_count": 50000 },
                    "number_of_shards": 1,
                    "number_of_replicas": 1
                }
            }
        })
    }
}

async fn status_error(response: reqwest::Response) -> IndexError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    IndexError::Status { status, body }
}

#[async_trait]
impl Indexer for ElasticsearchIndexer {
    async fn index(&self, document: &IndexDocument) -> Result<(), IndexError> {
        let response = self
            .client
            .post(format!("{}/_doc", self.index_url()))
            .json(document)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: IndexResponse = response.json().await?;
        match body.result.as_deref() {
            Some("created") | Some("updated") | None => Ok(()),
            Some(other) => Err(IndexError::Rejected(other.to_string())),
        }
    }

    /// Creates the index with its mapping if it does not exist
    async fn prepare(&self) -> Result<(), IndexError> {
        let head = self.client.head(self.index_url()).send().await?;
        if head.status().is_success() {
            return Ok(());
        }
        if head.status() != StatusCode::NOT_FOUND {
            return Err(status_error(head).await);
        }

        tracing::info!("Creating search index {}", self.index);
        let response = self
            .client
            .put(self.index_url())
            .json(&Self::mapping())
            .send()
            .await?;

        // Another project may have created it first
        if response.status().is_success() || response.status() == StatusCode::BAD_REQUEST {
            return Ok(());
        }
        Err(status_error(response).await)
    }
}
