//! Error types for the engine client and the search gateway.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the search engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Connection, timeout, or body decoding failure.
    #[error("engine transport error: {0}")]
    Transport(#[from] opensearch::Error),

    /// The client could not be configured from the given settings.
    #[error("engine connection setup failed: {0}")]
    Connection(String),

    /// The engine answered with a non-success status.
    #[error("engine returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The engine answered, but not with the shape we expected.
    #[error("unexpected engine response: {0}")]
    Malformed(String),
}

impl EngineError {
    /// True when the engine reported that the index does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Status { status: 404, .. })
    }
}

/// Errors surfaced by [`crate::gateway::SearchGateway`] operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to read trial source {}: {source}", .path.display())]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trial source {}: {source}", .path.display())]
    SourceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;
