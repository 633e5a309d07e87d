//! Lake error types.

use std::path::PathBuf;

/// Errors from writing the output tables.
#[derive(Debug, thiserror::Error)]
pub enum LakeError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row to Arrow conversion or schema tracing failed.
    #[error("serde_arrow error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> LakeError {
    LakeError::Io {
        path: path.into(),
        source,
    }
}
