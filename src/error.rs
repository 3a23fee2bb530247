//! Error types for siftd operations.
//!
//! This module provides a comprehensive error hierarchy using `thiserror` for
//! all subsystems: the processing pipeline, the indexer, the query service,
//! and supporting I/O.

use thiserror::Error;

/// Result type alias for siftd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for siftd operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Document-processing pipeline errors.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Indexer and index-store errors.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Query-service errors.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// I/O errors (file and directory operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Errors raised while transforming raw documents.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Record failed basic validation (missing URL, empty content).
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// Why the record was rejected.
        reason: String,
    },

    /// Record content was not English.
    #[error("non-English content: {url}")]
    NonEnglish {
        /// URL of the rejected record.
        url: String,
    },

    /// Extracted main content fell below the configured minimum.
    #[error("content too short: {length} < {minimum}")]
    ContentTooShort {
        /// Extracted content length in characters.
        length: usize,
        /// Configured minimum length.
        minimum: usize,
    },

    /// No chunk survived the size and word-count filters.
    #[error("no valid chunks produced for {url}")]
    NoChunks {
        /// URL of the rejected record.
        url: String,
    },

    /// Malformed JSON in an input file.
    #[error("malformed record in {path} line {line}: {reason}")]
    MalformedRecord {
        /// Input file path.
        path: String,
        /// One-based line number.
        line: usize,
        /// Parse error detail.
        reason: String,
    },

    /// Worker pool was shut down before the task could run.
    #[error("pipeline shutting down")]
    ShuttingDown,
}

/// Errors raised by the indexer and the index-store client.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Transport-level failure talking to the index store.
    #[error("index store unreachable: {0}")]
    Transport(String),

    /// The index store rejected a request.
    #[error("index store rejected {operation}: status {status}")]
    Rejected {
        /// Operation that was rejected (bulk, mget, search, ...).
        operation: String,
        /// HTTP status code returned.
        status: u16,
    },

    /// A bulk flush exhausted its retries.
    #[error("bulk flush failed after {attempts} attempts: {reason}")]
    BulkExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last failure reason.
        reason: String,
    },

    /// Queue admission timed out under backpressure.
    #[error("queue admission timed out after {waited_secs}s")]
    QueueFull {
        /// Seconds spent waiting for queue space.
        waited_secs: u64,
    },

    /// Response body could not be decoded.
    #[error("malformed index store response: {0}")]
    MalformedResponse(String),
}

/// Errors raised by the query service.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query string was empty after normalization.
    #[error("empty query")]
    EmptyQuery,

    /// Requested limit was out of range.
    #[error("invalid limit {limit}, maximum is {max}")]
    InvalidLimit {
        /// Requested limit.
        limit: usize,
        /// Maximum allowed limit.
        max: usize,
    },

    /// The search backend is not reachable.
    #[error("search unavailable: {0}")]
    Unavailable(String),
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// File move error (queue directory transitions).
    #[error("failed to move file: {from} -> {to}: {reason}")]
    MoveFailed {
        /// Source path.
        from: String,
        /// Destination path.
        to: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

// Implement From traits for standard library and third-party errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Index(IndexError::MalformedResponse(err.to_string()))
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Index(IndexError::Transport(err.to_string()))
    }
}
