use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error(
        "Index and metadata are out of sync ({rows} vector rows, {records} metadata records); rebuild the index"
    )]
    JoinInconsistency { rows: usize, records: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod composer;
pub mod config;
pub mod embeddings;
pub mod retrieval;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
