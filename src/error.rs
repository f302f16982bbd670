use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssessError {
    /// No analysis bundle to score. Callers should ask the user to run an
    /// analysis first instead of scoring an empty profile.
    #[error("no emotion profile available: {0} (analyze posts first)")]
    InvalidInput(String),
    #[error("invalid risk rules: {0}")]
    InvalidRules(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report {0} not found")]
    NotFound(String),
    #[error("invalid report id {0:?}")]
    InvalidId(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed report record {path}: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
