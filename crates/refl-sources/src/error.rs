//! Reader error types.

use std::path::PathBuf;

use refl_core::errors::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The file or directory could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reduced file has no usable data rows.
    #[error("No data rows found in {0}")]
    NoData(String),

    /// The model file is not valid JSON.
    #[error("Invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The model file has a shape the reader does not understand.
    #[error("Unsupported model layout: {0}")]
    ModelLayout(String),

    /// A Parquet file could not be decoded.
    #[error("Parquet error in {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    /// An Arrow batch could not be decoded.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// The parsed contract violates its invariants.
    #[error(transparent)]
    Contract(#[from] CoreError),
}

impl SourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
