//! # Trial Search
//!
//! An HTTP search API over an OpenSearch index of clinical-trial records.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌───────────────┐   ┌────────────┐
//! │ ctg-studies  │──▶│  Mapper  │──▶│ SearchGateway │──▶│ OpenSearch │
//! │    .json     │   │ (pure)   │   │               │   │   index    │
//! └──────────────┘   └──────────┘   └───────┬───────┘   └────────────┘
//!                                           │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                 ┌──────────┐        ┌──────────┐
//!                 │   CLI    │        │   HTTP   │
//!                 │ (trials) │        │  (Axum)  │
//!                 └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! trials reindex                  # create the index and load data/ctg-studies.json
//! trials search "breast cancer"   # query from the terminal
//! trials stats                    # document count and size
//! trials serve                    # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Indexed document, search result, and stats types |
//! | [`mapper`] | Raw trial record → indexed document (total, never fails) |
//! | [`engine`] | Search engine trait with OpenSearch and in-memory backends |
//! | [`gateway`] | Index build, query, delete, and stats over an engine |
//! | [`server`] | HTTP API (Axum) with CORS |
//! | [`error`] | Engine and gateway error types |
//! | [`ingest`] | `trials reindex` / `trials delete-index` |
//! | [`search`] | `trials search` |
//! | [`stats`] | `trials stats` |

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod mapper;
pub mod models;
pub mod search;
pub mod server;
pub mod stats;

pub use gateway::{SearchGateway, SearchRequest};
pub use models::{SearchResult, TrialDocument};
