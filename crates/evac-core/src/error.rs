//! Core error type.
//!
//! Sub-crates define their own error enums; `CoreError` only covers what
//! this crate can fail at (reading configuration).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `evac-core`.
pub type CoreResult<T> = Result<T, CoreError>;
