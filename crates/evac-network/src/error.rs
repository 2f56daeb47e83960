//! Network-subsystem error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `evac-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The loaded graph violates a structural invariant.  Not recoverable:
    /// the network must not be used.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    #[error("node {0} not found in graph")]
    NodeNotFound(String),

    #[error("network {area} {mode} not found")]
    NetworkMissing { area: String, mode: String },

    #[error("invalid edge feature: {0}")]
    InvalidEdge(String),

    #[error("search cancelled")]
    Cancelled,

    #[error("search exceeded its limit of {0} node expansions")]
    StepLimitExceeded(usize),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
