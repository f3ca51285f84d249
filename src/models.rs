//! Core data models used throughout Trial Search.
//!
//! These types represent the indexed trial documents, search requests, and
//! search results that flow between the HTTP layer, the gateway, and the
//! search engine.

use serde::{Deserialize, Serialize};

/// Flat, indexable form of one clinical-trial record.
///
/// Produced by [`crate::mapper::map_trial`]. Serialized with camelCase keys;
/// every key is always present so the engine mapping sees a complete document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialDocument {
    pub nct_id: String,
    pub brief_title: String,
    pub official_title: String,
    /// Distinct conditions in first-seen order. Repeats in the source record
    /// are collapsed, so this is not a verbatim copy of the source list.
    pub conditions: Vec<String>,
    pub overall_status: String,
    pub start_date: Option<String>,
    pub completion_date: Option<String>,
    pub interventions: Vec<Intervention>,
    pub eligibility_criteria: String,
    pub healthy_volunteers: bool,
    pub gender: String,
    pub minimum_age: i64,
    pub maximum_age: i64,
    pub locations: Vec<Location>,
}

/// One arm intervention, indexed as a nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

/// One trial site, indexed as a nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub facility: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// A search result returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub nct_id: String,
    pub brief_title: String,
    pub official_title: Option<String>,
    pub conditions: Vec<String>,
    pub overall_status: String,
}

impl SearchResult {
    /// Build a result from one raw engine hit, reading its `_source`.
    ///
    /// Missing or mistyped fields fall back to empty values rather than
    /// failing the whole page.
    pub fn from_hit(hit: &serde_json::Value) -> Self {
        let source = hit.get("_source");
        let text = |key: &str| {
            source
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        let conditions = source
            .and_then(|s| s.get("conditions"))
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|c| c.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            nct_id: text("nctId").unwrap_or_default(),
            brief_title: text("briefTitle").unwrap_or_default(),
            official_title: text("officialTitle"),
            conditions,
            overall_status: text("overallStatus").unwrap_or_default(),
        }
    }
}

/// Document count and on-disk size of the trial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub doc_count: u64,
    pub size_in_bytes: u64,
}

/// Outcome of a bulk load: how many items the engine accepted and rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkSummary {
    pub fn merge(&mut self, other: BulkSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}
