//! In-memory [`SearchEngine`] implementation for testing and offline runs.
//!
//! Indices live in a `HashMap` behind `std::sync::RwLock`. Field behaviour
//! follows the mapping passed to `create_index`:
//!
//! - `keyword` fields match only the whole query string, case-sensitively.
//! - `text` fields (and unmapped fields) match on lowercase alphanumeric
//!   tokens; the score is the number of query tokens found.
//! - `date`, `integer`, and `boolean` fields are type-checked at ingest, so a
//!   malformed document is rejected per item like a real cluster would.
//!
//! Only `multi_match` and `match_all` queries are understood.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use super::{BulkItem, SearchEngine};
use crate::error::EngineError;
use crate::models::{BulkSummary, IndexStats};

static NULL: Value = Value::Null;

#[derive(Default)]
struct MemoryIndex {
    /// Top-level field name → mapping type.
    field_types: HashMap<String, String>,
    docs: Vec<(String, Value)>,
    next_id: u64,
}

/// In-memory engine for tests.
pub struct InMemoryEngine {
    indices: RwLock<HashMap<String, MemoryIndex>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
        }
    }

    /// Field types recorded for `index` when it was created.
    pub fn mapping(&self, index: &str) -> Option<HashMap<String, String>> {
        let indices = self.indices.read().unwrap();
        indices.get(index).map(|i| i.field_types.clone())
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn index_not_found(index: &str) -> EngineError {
    EngineError::Status {
        status: 404,
        body: json!({
            "error": {"type": "index_not_found_exception", "reason": format!("no such index [{}]", index)},
            "status": 404
        })
        .to_string(),
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Strings held by a field: a single string or every string in an array.
fn field_strings(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str()).collect(),
        _ => Vec::new(),
    }
}

fn is_valid_date(s: &str) -> bool {
    let candidate = match s.len() {
        4 => format!("{}-01-01", s),
        7 => format!("{}-01", s),
        _ => s.chars().take(10).collect(),
    };
    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").is_ok()
}

/// Check one document against the index mapping; `Err` carries the reason.
fn validate_document(index: &MemoryIndex, source: &Value) -> Result<(), String> {
    let obj = source
        .as_object()
        .ok_or_else(|| "document source must be an object".to_string())?;

    for (field, value) in obj {
        if value.is_null() {
            continue;
        }
        let ok = match index.field_types.get(field).map(String::as_str) {
            Some("date") => value.as_str().map(is_valid_date).unwrap_or(false),
            Some("integer") => value
                .as_i64()
                .map(|n| i32::try_from(n).is_ok())
                .unwrap_or(false),
            Some("boolean") => value.is_boolean(),
            Some("nested") => value.is_array() || value.is_object(),
            _ => true,
        };
        if !ok {
            return Err(format!("failed to parse field [{}]", field));
        }
    }
    Ok(())
}

/// Split `field^boost` into name and boost factor.
fn parse_field(entry: &str) -> (&str, f64) {
    match entry.split_once('^') {
        Some((name, boost)) => (name, boost.parse().unwrap_or(1.0)),
        None => (entry, 1.0),
    }
}

fn score_document(index: &MemoryIndex, source: &Value, text: &str, fields: &[(&str, f64)]) -> f64 {
    let query_tokens = tokenize(text);
    let mut score = 0.0;

    for (field, boost) in fields {
        let values = field_strings(source.get(*field));
        match index.field_types.get(*field).map(String::as_str) {
            Some("keyword") => {
                if values.iter().any(|v| *v == text) {
                    score += boost;
                }
            }
            _ => {
                let doc_tokens: Vec<String> = values.iter().flat_map(|v| tokenize(v)).collect();
                let matches = query_tokens
                    .iter()
                    .filter(|t| doc_tokens.contains(t))
                    .count();
                score += boost * matches as f64;
            }
        }
    }
    score
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    async fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        Ok(self.indices.read().unwrap().contains_key(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError> {
        let mut indices = self.indices.write().unwrap();
        if indices.contains_key(index) {
            return Err(EngineError::Status {
                status: 400,
                body: format!("resource_already_exists_exception: index [{}]", index),
            });
        }

        let field_types = body
            .pointer("/mappings/properties")
            .and_then(|p| p.as_object())
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(name, def)| {
                        def.get("type")
                            .and_then(|t| t.as_str())
                            .map(|t| (name.clone(), t.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        indices.insert(
            index.to_string(),
            MemoryIndex {
                field_types,
                ..MemoryIndex::default()
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        match self.indices.write().unwrap().remove(index) {
            Some(_) => Ok(()),
            None => Err(index_not_found(index)),
        }
    }

    async fn stats(&self, index: &str) -> Result<IndexStats, EngineError> {
        let indices = self.indices.read().unwrap();
        let idx = indices.get(index).ok_or_else(|| index_not_found(index))?;
        let size_in_bytes = idx
            .docs
            .iter()
            .map(|(_, doc)| doc.to_string().len() as u64)
            .sum();
        Ok(IndexStats {
            doc_count: idx.docs.len() as u64,
            size_in_bytes,
        })
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, EngineError> {
        let indices = self.indices.read().unwrap();
        let idx = indices.get(index).ok_or_else(|| index_not_found(index))?;

        let from = body.get("from").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let size = body.get("size").and_then(|v| v.as_u64()).unwrap_or(10) as usize;
        let query = body.get("query").unwrap_or(&NULL);

        let mut scored: Vec<(f64, &String, &Value)> = if query.get("match_all").is_some() {
            idx.docs.iter().map(|(id, doc)| (1.0, id, doc)).collect()
        } else if let Some(mm) = query.get("multi_match") {
            let text = mm
                .get("query")
                .and_then(|q| q.as_str())
                .ok_or_else(|| EngineError::Malformed("multi_match requires a query".into()))?;
            let fields: Vec<(&str, f64)> = mm
                .get("fields")
                .and_then(|f| f.as_array())
                .map(|f| f.iter().filter_map(|v| v.as_str()).map(parse_field).collect())
                .unwrap_or_default();
            idx.docs
                .iter()
                .map(|(id, doc)| (score_document(idx, doc, text, &fields), id, doc))
                .filter(|(score, _, _)| *score > 0.0)
                .collect()
        } else {
            return Err(EngineError::Status {
                status: 400,
                body: format!("unsupported query: {}", query),
            });
        };

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let total = scored.len();
        let max_score = scored.first().map(|(s, _, _)| *s);
        let hits: Vec<Value> = scored
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(score, id, doc)| {
                json!({
                    "_index": index,
                    "_id": id,
                    "_score": score,
                    "_source": doc,
                })
            })
            .collect();

        Ok(json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": {"value": total, "relation": "eq"},
                "max_score": max_score,
                "hits": hits,
            }
        }))
    }

    async fn bulk(&self, index: &str, items: &[BulkItem]) -> Result<BulkSummary, EngineError> {
        let mut indices = self.indices.write().unwrap();
        // Like a real cluster, bulk into a missing index creates it unmapped.
        let idx = indices.entry(index.to_string()).or_default();

        let mut summary = BulkSummary::default();
        for item in items {
            if let Err(reason) = validate_document(idx, &item.source) {
                tracing::debug!(id = ?item.id, %reason, "bulk item rejected");
                summary.failed += 1;
                continue;
            }

            let id = match &item.id {
                Some(id) => id.clone(),
                None => {
                    idx.next_id += 1;
                    format!("auto-{}", idx.next_id)
                }
            };
            match idx.docs.iter_mut().find(|(existing, _)| *existing == id) {
                Some(slot) => slot.1 = item.source.clone(),
                None => idx.docs.push((id, item.source.clone())),
            }
            summary.succeeded += 1;
        }
        Ok(summary)
    }
}
