//! Common error types for the annotation tool

use thiserror::Error;

/// Common result type for annotation tool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the annotation tool crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error while reading the article dataset
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error talking to a remote sink
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Article dataset is unusable (missing columns, too few rows)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Submission sink rejected or failed to store a payload
    #[error("Submission error: {0}")]
    Sink(String),

    /// Annotation index does not exist for the article
    #[error("Annotation index {index} out of range for article {article_id} ({len} annotations)")]
    IndexOutOfRange {
        article_id: u32,
        index: usize,
        len: usize,
    },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
