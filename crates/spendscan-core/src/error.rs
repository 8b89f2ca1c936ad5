//! Error types for spendscan

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input, rejected before any state mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown record, or a record not owned by the caller.
    /// Ownership mismatches report identically to avoid leaking existence.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempted transition from an unexpected source state. The client
    /// should refresh and re-read rather than retry blindly.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// OCR adapter failure. Retried with backoff inside the pipeline;
    /// never propagated to the caller of upload.
    #[error("Adapter failure: {0}")]
    Adapter(String),

    /// Internal invariant violation. Aborts the operation; persisted
    /// state stays consistent via conditional writes.
    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
