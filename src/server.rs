//! HTTP API server.
//!
//! A thin Axum layer that validates query parameters, calls the shared
//! [`SearchGateway`], and shapes its answers into JSON.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/version` | Service version |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/search` | Multi-field full-text search with pagination |
//! | `GET`  | `/index-info` | Document count and store size |
//! | `POST` | `/reindex` | Drop and rebuild the index from the data file |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "size must be between 1 and 100" } }
//! ```
//!
//! Error codes: `bad_request` (400), `engine_error` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends can
//! query the API directly.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::gateway::{SearchGateway, SearchRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::models::{IndexStats, SearchResult};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<SearchGateway>,
    /// Trial file loaded by `POST /reindex`.
    data_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(gateway: Arc<SearchGateway>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            data_path: Arc::new(data_path.into()),
        }
    }
}

/// Starts the HTTP server.
///
/// Connects the gateway described by `config`, binds `[server].bind`, and
/// serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let gateway = Arc::new(SearchGateway::from_config(config)?);
    let state = AppState::new(gateway, config.data.path.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        index = %config.engine.index,
        "trial search server listening"
    );
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/version", get(handle_version))
        .route("/health", get(handle_health))
        .route("/search", get(handle_search))
        .route("/index-info", get(handle_index_info))
        .route("/reindex", post(handle_reindex))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn engine_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "engine_error",
        message: message.into(),
    }
}

/// Last-resort handler: a panicking request still gets the JSON error shape.
fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("request handler panicked");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "internal server error".to_string(),
    }
    .into_response()
}

// ============ GET /version, GET /health ============

#[derive(Serialize)]
struct VersionResponse {
    version: String,
}

async fn handle_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

/// Turn raw query pairs into a validated [`SearchRequest`].
///
/// `fields` may repeat (`?fields=briefTitle&fields=conditions`); the other
/// parameters take their last occurrence.
fn parse_search_params(pairs: &[(String, String)]) -> Result<SearchRequest, AppError> {
    let last = |key: &str| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let q = last("q").ok_or_else(|| bad_request("missing required parameter: q"))?;
    if q.is_empty() {
        return Err(bad_request("q must be at least 1 character"));
    }

    let page = match last("page") {
        Some(p) => p
            .parse::<usize>()
            .map_err(|_| bad_request(format!("page must be an integer >= 1, got '{}'", p)))?,
        None => 1,
    };
    let size = match last("size") {
        Some(s) => s.parse::<usize>().map_err(|_| {
            bad_request(format!(
                "size must be an integer between 1 and {}, got '{}'",
                MAX_PAGE_SIZE, s
            ))
        })?,
        None => DEFAULT_PAGE_SIZE,
    };

    let mut request = SearchRequest::new(q).with_page(page, size);
    let fields: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == "fields")
        .map(|(_, v)| v.as_str())
        .collect();
    if !fields.is_empty() {
        request = request.with_fields(fields);
    }

    request.validate().map_err(|e| bad_request(e.to_string()))?;
    Ok(request)
}

async fn handle_search(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let request = parse_search_params(&pairs)?;

    let hits = state
        .gateway
        .query(&request)
        .await
        .map_err(|e| engine_error(format!("search operation failed: {}", e)))?;

    let results = hits.iter().map(SearchResult::from_hit).collect();
    Ok(Json(results))
}

// ============ GET /index-info ============

async fn handle_index_info(State(state): State<AppState>) -> Result<Json<IndexStats>, AppError> {
    let stats = state
        .gateway
        .get_stats()
        .await
        .map_err(|e| engine_error(format!("failed to retrieve index stats: {}", e)))?;
    Ok(Json(stats))
}

// ============ POST /reindex ============

#[derive(Serialize)]
struct ReindexResponse {
    message: String,
    indexed: usize,
    failed: usize,
}

/// Drop the index and rebuild it from the data file.
///
/// Always answers 200; engine and source errors are logged by the gateway and
/// reflected in `message`.
async fn handle_reindex(State(state): State<AppState>) -> Json<ReindexResponse> {
    // A missing index comes back as Ok(false).
    if let Err(e) = state.gateway.delete_index().await {
        warn!(error = %e, "could not drop index before reindex, rebuilding anyway");
    }

    let response = match state.gateway.build_index(&state.data_path).await {
        Ok(summary) => ReindexResponse {
            message: "Reindexing completed".to_string(),
            indexed: summary.succeeded,
            failed: summary.failed,
        },
        Err(e) => ReindexResponse {
            message: format!("Reindexing failed: {}", e),
            indexed: 0,
            failed: 0,
        },
    };
    Json(response)
}
