//! Search engine client abstraction.
//!
//! The [`SearchEngine`] trait models the small slice of the engine's REST
//! protocol this service needs: index existence/creation/deletion, stats,
//! search, and bulk ingestion. Two implementations ship with the crate:
//!
//! - **[`OpenSearchClient`]** — talks to an OpenSearch (or Elasticsearch
//!   compatible) cluster over HTTP.
//! - **[`InMemoryEngine`]** — process-local engine for tests and offline runs.
//!
//! Implementations must be `Send + Sync`; one instance is shared by every
//! in-flight request.

pub mod memory;
pub mod opensearch;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;
use crate::models::{BulkSummary, IndexStats};

pub use memory::InMemoryEngine;
pub use opensearch::OpenSearchClient;

/// One document queued for bulk ingestion.
#[derive(Debug, Clone)]
pub struct BulkItem {
    /// Explicit document id; `None` lets the engine assign one.
    pub id: Option<String>,
    pub source: Value,
}

/// Abstract interface to the external search engine.
///
/// | Method | Engine call |
/// |--------|-------------|
/// | [`index_exists`](SearchEngine::index_exists) | `HEAD /{index}` |
/// | [`create_index`](SearchEngine::create_index) | `PUT /{index}` |
/// | [`delete_index`](SearchEngine::delete_index) | `DELETE /{index}` |
/// | [`stats`](SearchEngine::stats) | `GET /{index}/_stats` |
/// | [`search`](SearchEngine::search) | `POST /{index}/_search` |
/// | [`bulk`](SearchEngine::bulk) | `POST /_bulk` |
///
/// A missing index is reported as [`EngineError::Status`] with status 404
/// by every method except `index_exists`.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, EngineError>;

    /// Create `index` with the given settings/mappings body.
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError>;

    async fn delete_index(&self, index: &str) -> Result<(), EngineError>;

    async fn stats(&self, index: &str) -> Result<IndexStats, EngineError>;

    /// Run a query DSL body and return the raw engine response.
    async fn search(&self, index: &str, body: &Value) -> Result<Value, EngineError>;

    /// Index every item, reporting per-item success and failure counts.
    ///
    /// Individual item rejections are counted, not returned as errors; an
    /// `Err` means the call as a whole did not complete.
    async fn bulk(&self, index: &str, items: &[BulkItem]) -> Result<BulkSummary, EngineError>;
}
