//! Error types shared by the scanner, the range readers and the providers.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for every fallible operation in the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed archive: {0}")]
    Parse(#[from] ParseError),

    #[error("attachment not found: {path}")]
    NotFound { path: String },

    #[error("attachment is empty: {path}")]
    EmptyFile { path: String },

    #[error("unsupported file type: {name}")]
    UnsupportedType { name: String },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid index: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("indexing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Structural problems found while walking tar headers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("archive truncated inside header at offset {offset}")]
    TruncatedHeader { offset: u64 },

    #[error("entry at offset {offset} claims {size} bytes but only {available} remain")]
    TruncatedData {
        offset: u64,
        size: u64,
        available: u64,
    },

    #[error("invalid size field in header at offset {offset}")]
    InvalidSize { offset: u64 },

    #[error("invalid PAX record in header at offset {offset}: {reason}")]
    PaxRecord { offset: u64, reason: &'static str },

    #[error("archive does not contain {what}")]
    MissingEntry { what: &'static str },
}

/// Failures talking to the storage backend.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP request failed with status: {status}")]
    Status { status: u16 },

    #[error("remote server does not honor Range requests (status {status})")]
    RangeUnsupported { status: u16 },

    #[error("remote server did not report the object size")]
    MissingContentRange,

    #[error("range {start}-{end} is outside the object ({size} bytes)")]
    OutOfBounds { start: u64, end: u64, size: u64 },

    #[error("expected {expected} bytes, received {received}")]
    ShortBody { expected: u64, received: u64 },
}
