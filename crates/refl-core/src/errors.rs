//! Cross-cutting error types for the assembler.
//!
//! Domain-specific errors (`SourceError`, `AssemblyError`, `LakeError`, ...)
//! live in their respective crates and are converged in `refl-cli` through
//! `anyhow`.

use thiserror::Error;

/// Errors raised while checking the shape of source contracts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// The measurement carries no data points.
    #[error("Measurement has no data points")]
    EmptyMeasurement,

    /// The Q/R/dR/dQ columns disagree on length.
    #[error("Measurement columns have unequal lengths: q={q}, r={r}, dr={dr}, dq={dq}")]
    ColumnLengthMismatch {
        q: usize,
        r: usize,
        dr: usize,
        dq: usize,
    },

    /// A model source was built with no experiments.
    #[error("Model contains no experiments")]
    EmptyModel,

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),
}
