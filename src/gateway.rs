//! Search gateway: the only component that talks to the search engine.
//!
//! [`SearchGateway`] is built once at startup and shared (behind `Arc`) by
//! every request handler and CLI command. It exposes four operations:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`build_index`](SearchGateway::build_index) | Create the index if absent, then bulk-load a trial file |
//! | [`query`](SearchGateway::query) | Multi-field match with pagination, returns raw hits |
//! | [`delete_index`](SearchGateway::delete_index) | Drop the index; absence is not an error |
//! | [`get_stats`](SearchGateway::get_stats) | Document count and store size |
//!
//! Every engine failure is logged here before being returned, so callers
//! only decide how to present it.
//!
//! # Index lifecycle
//!
//! ```text
//!            build_index (create + load)
//!   ABSENT ───────────────────────────────▶ PRESENT ──┐ build_index
//!     ▲                                        │  ◀───┘ (load only)
//!     └──────────── delete_index ──────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::engine::{BulkItem, OpenSearchClient, SearchEngine};
use crate::error::{GatewayError, Result};
use crate::mapper::map_trial;
use crate::models::{BulkSummary, IndexStats};

/// Fields searched when the caller does not name any.
pub const DEFAULT_FIELDS: [&str; 3] = ["briefTitle", "officialTitle", "conditions"];
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
/// Bulk items sent per `_bulk` call.
pub const DEFAULT_BULK_CHUNK_SIZE: usize = 500;

/// A free-text query over a set of fields, one page at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub text: String,
    pub fields: Vec<String>,
    /// 1-based page number.
    pub page: usize,
    pub size: usize,
}

impl SearchRequest {
    /// A first-page request over [`DEFAULT_FIELDS`].
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page(mut self, page: usize, size: usize) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "query text must not be empty".into(),
            ));
        }
        if self.fields.is_empty() || self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(GatewayError::InvalidRequest(
                "fields must name at least one non-empty field".into(),
            ));
        }
        if self.page < 1 {
            return Err(GatewayError::InvalidRequest("page must be >= 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            return Err(GatewayError::InvalidRequest(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if (self.page - 1).checked_mul(self.size).is_none() {
            return Err(GatewayError::InvalidRequest(format!(
                "page {} is out of range for size {}",
                self.page, self.size
            )));
        }
        Ok(())
    }

    /// Number of hits skipped before this page.
    ///
    /// Saturates for pages that [`validate`](Self::validate) rejects.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }

    /// Engine query DSL for this request.
    pub fn to_query_body(&self) -> Value {
        json!({
            "size": self.size,
            "from": self.offset(),
            "query": {
                "multi_match": {
                    "query": self.text,
                    "fields": self.fields,
                }
            }
        })
    }
}

/// Settings and mappings for the trial index.
///
/// `keyword` fields are exact-match facets, `text` fields are analysed, and
/// interventions/locations are `nested` so their sub-fields match per element.
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "nctId": {"type": "keyword"},
                "briefTitle": {"type": "text"},
                "officialTitle": {"type": "text"},
                "overallStatus": {"type": "keyword"},
                "startDate": {"type": "date"},
                "completionDate": {"type": "date"},
                "conditions": {"type": "keyword"},
                "interventions": {
                    "type": "nested",
                    "properties": {
                        "type": {"type": "keyword"},
                        "name": {"type": "text"}
                    }
                },
                "eligibilityCriteria": {"type": "text"},
                "healthyVolunteers": {"type": "boolean"},
                "gender": {"type": "keyword"},
                "minimumAge": {"type": "integer"},
                "maximumAge": {"type": "integer"},
                "locations": {
                    "type": "nested",
                    "properties": {
                        "facility": {"type": "text"},
                        "city": {"type": "keyword"},
                        "state": {"type": "keyword"},
                        "country": {"type": "keyword"}
                    }
                }
            }
        }
    })
}

pub struct SearchGateway {
    engine: Arc<dyn SearchEngine>,
    index: String,
    bulk_chunk_size: usize,
}

impl SearchGateway {
    pub fn new(engine: Arc<dyn SearchEngine>, index: impl Into<String>) -> Self {
        Self {
            engine,
            index: index.into(),
            bulk_chunk_size: DEFAULT_BULK_CHUNK_SIZE,
        }
    }

    pub fn with_bulk_chunk_size(mut self, size: usize) -> Self {
        self.bulk_chunk_size = size.max(1);
        self
    }

    /// Build a gateway backed by the OpenSearch cluster in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = OpenSearchClient::new(&config.engine)?;
        Ok(Self::new(Arc::new(client), config.engine.index.clone())
            .with_bulk_chunk_size(config.data.bulk_chunk_size))
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Create the index with [`index_mapping`] unless it already exists.
    ///
    /// Returns `true` when the index was created by this call.
    pub async fn ensure_index(&self) -> Result<bool> {
        let exists = self.engine.index_exists(&self.index).await.map_err(|e| {
            error!(index = %self.index, error = %e, "failed to check index existence");
            e
        })?;

        if exists {
            info!(index = %self.index, "index already exists, keeping its mapping");
            return Ok(false);
        }

        self.engine
            .create_index(&self.index, &index_mapping())
            .await
            .map_err(|e| {
                error!(index = %self.index, error = %e, "failed to create index");
                e
            })?;
        info!(index = %self.index, "created index");
        Ok(true)
    }

    /// Ensure the index exists, then map and bulk-load every record in the
    /// JSON array at `path`.
    ///
    /// Rejected items and failed bulk calls are counted in the returned
    /// summary; loading continues past them.
    pub async fn build_index(&self, path: &Path) -> Result<BulkSummary> {
        self.ensure_index().await?;

        let records = read_trials(path).await.map_err(|e| {
            error!(error = %e, "failed to load trial source");
            e
        })?;
        info!(path = %path.display(), records = records.len(), "loaded trial source");

        let items: Vec<BulkItem> = records
            .iter()
            .map(|raw| {
                let doc = map_trial(raw);
                let id = Some(doc.nct_id.clone()).filter(|id| !id.is_empty());
                BulkItem {
                    id,
                    source: serde_json::to_value(&doc).unwrap_or(Value::Null),
                }
            })
            .collect();

        let summary = self.load(&items).await;
        info!(
            index = %self.index,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "bulk load finished"
        );
        if summary.failed > 0 {
            warn!(failed = summary.failed, "some documents were not indexed");
        }
        Ok(summary)
    }

    /// Send items in chunks; a failed chunk counts all of its items as failed.
    async fn load(&self, items: &[BulkItem]) -> BulkSummary {
        let mut summary = BulkSummary::default();
        for chunk in items.chunks(self.bulk_chunk_size) {
            match self.engine.bulk(&self.index, chunk).await {
                Ok(part) => summary.merge(part),
                Err(e) => {
                    error!(items = chunk.len(), error = %e, "bulk request failed");
                    summary.failed += chunk.len();
                }
            }
        }
        summary
    }

    /// Run a multi-field match and return the engine's raw hit list.
    ///
    /// An engine that answers with no hits yields `Ok(vec![])`; an engine
    /// that cannot answer yields `Err`.
    pub async fn query(&self, request: &SearchRequest) -> Result<Vec<Value>> {
        request.validate()?;

        let response = self
            .engine
            .search(&self.index, &request.to_query_body())
            .await
            .map_err(|e| {
                error!(index = %self.index, error = %e, "search failed");
                e
            })?;

        let hits = response
            .pointer("/hits/hits")
            .and_then(|h| h.as_array())
            .cloned()
            .unwrap_or_default();
        tracing::debug!(query = %request.text, hits = hits.len(), "search completed");
        Ok(hits)
    }

    /// Drop the index.
    ///
    /// Returns `Ok(false)` when there was nothing to delete.
    pub async fn delete_index(&self) -> Result<bool> {
        match self.engine.delete_index(&self.index).await {
            Ok(()) => {
                info!(index = %self.index, "deleted index");
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                warn!(index = %self.index, "index does not exist, nothing to delete");
                Ok(false)
            }
            Err(e) => {
                error!(index = %self.index, error = %e, "failed to delete index");
                Err(e.into())
            }
        }
    }

    pub async fn get_stats(&self) -> Result<IndexStats> {
        self.engine.stats(&self.index).await.map_err(|e| {
            error!(index = %self.index, error = %e, "failed to get index stats");
            e.into()
        })
    }
}

async fn read_trials(path: &Path) -> Result<Vec<Value>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| GatewayError::SourceIo {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| GatewayError::SourceParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use crate::error::EngineError;
    use async_trait::async_trait;
    use std::io::Write;

    /// Engine whose every call fails, standing in for an unreachable cluster.
    struct DownEngine;

    fn down() -> EngineError {
        EngineError::Status {
            status: 503,
            body: "cluster unavailable".into(),
        }
    }

    #[async_trait]
    impl SearchEngine for DownEngine {
        async fn index_exists(&self, _: &str) -> std::result::Result<bool, EngineError> {
            Err(down())
        }
        async fn create_index(&self, _: &str, _: &Value) -> std::result::Result<(), EngineError> {
            Err(down())
        }
        async fn delete_index(&self, _: &str) -> std::result::Result<(), EngineError> {
            Err(down())
        }
        async fn stats(&self, _: &str) -> std::result::Result<IndexStats, EngineError> {
            Err(down())
        }
        async fn search(&self, _: &str, _: &Value) -> std::result::Result<Value, EngineError> {
            Err(down())
        }
        async fn bulk(
            &self,
            _: &str,
            _: &[BulkItem],
        ) -> std::result::Result<BulkSummary, EngineError> {
            Err(down())
        }
    }

    fn trial(id: &str, title: &str, start: &str) -> Value {
        json!({
            "protocolSection": {
                "identificationModule": {"nctId": id, "briefTitle": title},
                "statusModule": {"overallStatus": "RECRUITING", "startDateStruct": {"date": start}},
                "conditionsModule": {"conditions": ["Asthma"]}
            }
        })
    }

    fn write_trials(records: &[Value]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(records).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[test]
    fn test_offset_page_two() {
        let req = SearchRequest::new("cancer").with_page(2, 10);
        assert_eq!(req.offset(), 10);
        let body = req.to_query_body();
        assert_eq!(body["from"], 10);
        assert_eq!(body["size"], 10);
        assert_eq!(body["query"]["multi_match"]["query"], "cancer");
        assert_eq!(
            body["query"]["multi_match"]["fields"],
            json!(["briefTitle", "officialTitle", "conditions"])
        );
    }

    #[test]
    fn test_first_page_offset_zero() {
        assert_eq!(SearchRequest::new("x").offset(), 0);
    }

    #[test]
    fn test_huge_page_rejected_not_wrapped() {
        let req = SearchRequest::new("x").with_page(usize::MAX, 100);
        assert!(matches!(
            req.validate(),
            Err(GatewayError::InvalidRequest(_))
        ));
        assert_eq!(req.offset(), usize::MAX);

        let req = SearchRequest::new("x").with_page(usize::MAX / 2 + 2, 2);
        assert!(req.validate().is_err());

        // Largest page whose offset still fits.
        let req = SearchRequest::new("x").with_page(usize::MAX / 100 + 1, 100);
        assert!(req.validate().is_ok());
        assert_eq!(req.offset(), usize::MAX / 100 * 100);
    }

    #[test]
    fn test_validate() {
        assert!(SearchRequest::new("cancer").validate().is_ok());
        assert!(SearchRequest::new("").validate().is_err());
        assert!(SearchRequest::new("x").with_page(0, 10).validate().is_err());
        assert!(SearchRequest::new("x").with_page(1, 0).validate().is_err());
        assert!(SearchRequest::new("x").with_page(1, 100).validate().is_ok());
        assert!(SearchRequest::new("x").with_page(1, 150).validate().is_err());
        assert!(SearchRequest::new("x")
            .with_fields(Vec::<String>::new())
            .validate()
            .is_err());
    }

    #[tokio::test]
    async fn test_build_index_creates_once_and_counts() {
        let engine = Arc::new(InMemoryEngine::new());
        let gateway = SearchGateway::new(engine.clone(), "trials").with_bulk_chunk_size(2);
        let file = write_trials(&[
            trial("NCT1", "Asthma inhaler study", "2020-01-01"),
            trial("NCT2", "Asthma diet study", "2021-06"),
            trial("NCT3", "Broken date", "someday"),
        ]);

        let summary = gateway.build_index(file.path()).await.unwrap();
        assert_eq!(summary, BulkSummary { succeeded: 2, failed: 1 });
        assert!(engine.mapping("trials").unwrap().contains_key("nctId"));

        // Second run keeps the index and upserts by nctId.
        let summary = gateway.build_index(file.path()).await.unwrap();
        assert_eq!(summary.succeeded, 2);
        assert!(!gateway.ensure_index().await.unwrap());
        assert_eq!(gateway.get_stats().await.unwrap().doc_count, 2);
    }

    #[tokio::test]
    async fn test_build_index_missing_file() {
        let gateway = SearchGateway::new(Arc::new(InMemoryEngine::new()), "trials");
        let err = gateway
            .build_index(Path::new("/nonexistent/ctg-studies.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SourceIo { .. }));
    }

    #[tokio::test]
    async fn test_build_index_not_an_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"studies\": []}").unwrap();
        let gateway = SearchGateway::new(Arc::new(InMemoryEngine::new()), "trials");
        let err = gateway.build_index(file.path()).await.unwrap_err();
        assert!(matches!(err, GatewayError::SourceParse { .. }));
    }

    #[tokio::test]
    async fn test_failed_bulk_chunks_are_counted() {
        let gateway = SearchGateway::new(Arc::new(DownEngine), "trials").with_bulk_chunk_size(2);
        let items: Vec<BulkItem> = (0..5)
            .map(|i| BulkItem {
                id: Some(i.to_string()),
                source: json!({}),
            })
            .collect();
        let summary = gateway.load(&items).await;
        assert_eq!(summary, BulkSummary { succeeded: 0, failed: 5 });
    }

    #[tokio::test]
    async fn test_query_distinguishes_empty_from_failure() {
        let engine = Arc::new(InMemoryEngine::new());
        let gateway = SearchGateway::new(engine, "trials");
        gateway.ensure_index().await.unwrap();
        let hits = gateway.query(&SearchRequest::new("nothing")).await.unwrap();
        assert!(hits.is_empty());

        let gateway = SearchGateway::new(Arc::new(DownEngine), "trials");
        let err = gateway.query(&SearchRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Engine(_)));
    }

    #[tokio::test]
    async fn test_delete_index_idempotent() {
        let gateway = SearchGateway::new(Arc::new(InMemoryEngine::new()), "trials");
        assert!(!gateway.delete_index().await.unwrap());
        gateway.ensure_index().await.unwrap();
        assert!(gateway.delete_index().await.unwrap());
        assert!(!gateway.delete_index().await.unwrap());

        let gateway = SearchGateway::new(Arc::new(DownEngine), "trials");
        assert!(gateway.delete_index().await.is_err());
    }

    #[tokio::test]
    async fn test_stats_on_absent_index_is_error() {
        let gateway = SearchGateway::new(Arc::new(InMemoryEngine::new()), "trials");
        assert!(gateway.get_stats().await.is_err());
    }
}
