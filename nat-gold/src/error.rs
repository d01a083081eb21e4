//! Errors raised while loading analysis inputs

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GoldError>;

#[derive(Error, Debug)]
pub enum GoldError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// File exists but holds nothing but whitespace
    #[error("File {0} is empty")]
    EmptyInput(PathBuf),

    #[error("No submissions found in the given inputs")]
    NoSubmissions,
}
