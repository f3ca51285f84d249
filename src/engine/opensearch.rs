//! OpenSearch client backed by the `opensearch` crate.
//!
//! A single-node transport carries the configured timeout, optional basic
//! auth, and optional certificate verification bypass for self-signed
//! development clusters.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::auth::Credentials;
use opensearch::cert::CertificateValidation;
use opensearch::http::request::JsonBody;
use opensearch::http::response::Response;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::http::{StatusCode, Url};
use opensearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesStatsParts,
};
use opensearch::{BulkParts, OpenSearch, SearchParts};
use serde_json::{json, Value};

use super::{BulkItem, SearchEngine};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{BulkSummary, IndexStats};

pub struct OpenSearchClient {
    client: OpenSearch,
    url: Url,
}

impl OpenSearchClient {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let url: Url = config
            .url
            .trim()
            .parse()
            .map_err(|e| EngineError::Connection(format!("invalid URL '{}': {}", config.url, e)))?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url.clone()))
            .timeout(Duration::from_secs(config.timeout_secs));

        if !config.verify_certs {
            builder = builder.cert_validation(CertificateValidation::None);
        }
        if let Some(user) = &config.username {
            builder = builder.auth(Credentials::Basic(
                user.clone(),
                config.resolved_password().unwrap_or_default(),
            ));
        }

        let transport = builder
            .build()
            .map_err(|e| EngineError::Connection(format!("failed to build transport: {}", e)))?;

        Ok(Self {
            client: OpenSearch::new(transport),
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Turn a non-success response into [`EngineError::Status`].
async fn check(response: Response) -> Result<Response, EngineError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EngineError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SearchEngine for OpenSearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;
        match response.status_code() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(EngineError::Status {
                status: s.as_u16(),
                body: String::new(),
            }),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn stats(&self, index: &str) -> Result<IndexStats, EngineError> {
        let response = self
            .client
            .indices()
            .stats(IndicesStatsParts::Index(&[index]))
            .send()
            .await?;
        let json: Value = check(response).await?.json().await?;
        parse_stats_response(index, &json)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, EngineError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body.clone())
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn bulk(&self, index: &str, items: &[BulkItem]) -> Result<BulkSummary, EngineError> {
        if items.is_empty() {
            return Ok(BulkSummary::default());
        }

        let body: Vec<JsonBody<Value>> = bulk_lines(items).into_iter().map(JsonBody::new).collect();
        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await?;
        let json: Value = check(response).await?.json().await?;
        parse_bulk_response(&json)
    }
}

/// Action/source line pairs for `_bulk`. The target index comes from the
/// request path, so actions only carry the document id.
fn bulk_lines(items: &[BulkItem]) -> Vec<Value> {
    let mut lines = Vec::with_capacity(items.len() * 2);
    for item in items {
        let action = match &item.id {
            Some(id) => json!({ "index": { "_id": id } }),
            None => json!({ "index": {} }),
        };
        lines.push(action);
        lines.push(item.source.clone());
    }
    lines
}

/// Count accepted and rejected items in a `_bulk` response.
fn parse_bulk_response(json: &Value) -> Result<BulkSummary, EngineError> {
    let items = json
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| EngineError::Malformed("bulk response missing items array".into()))?;

    let mut summary = BulkSummary::default();
    for item in items {
        // Each item is keyed by its action name ("index", "create", ...).
        let result = item.as_object().and_then(|o| o.values().next());
        let status = result
            .and_then(|r| r.get("status"))
            .and_then(|s| s.as_u64())
            .unwrap_or(500);
        let has_error = result.map(|r| r.get("error").is_some()).unwrap_or(true);

        if (200..300).contains(&status) && !has_error {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
            if let Some(reason) = result
                .and_then(|r| r.pointer("/error/reason"))
                .and_then(|r| r.as_str())
            {
                tracing::debug!(status, reason, "bulk item rejected");
            }
        }
    }
    Ok(summary)
}

/// Extract document count and store size from an `_stats` response.
fn parse_stats_response(index: &str, json: &Value) -> Result<IndexStats, EngineError> {
    let total = json
        .get("indices")
        .and_then(|i| i.get(index))
        .or_else(|| json.get("_all"))
        .and_then(|i| i.get("total"))
        .ok_or_else(|| {
            EngineError::Malformed(format!("stats response has no totals for '{}'", index))
        })?;

    let doc_count = total
        .pointer("/docs/count")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| EngineError::Malformed("stats response missing docs.count".into()))?;
    let size_in_bytes = total
        .pointer("/store/size_in_bytes")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| {
            EngineError::Malformed("stats response missing store.size_in_bytes".into())
        })?;

    Ok(IndexStats {
        doc_count,
        size_in_bytes,
    })
}
