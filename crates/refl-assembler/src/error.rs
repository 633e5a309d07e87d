//! Error types for dataset selection, record building and assembly.

use refl_core::errors::CoreError;
use thiserror::Error;

/// Explicit dataset index that does not name an experiment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Dataset index {index} is out of range: model has {count} experiment(s)")]
    IndexOutOfRange { index: usize, count: usize },
}

/// A builder could not produce its record.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    /// The measurement arrays are empty or disagree on length.
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(#[from] CoreError),

    /// A layer carries NaN or infinite values.
    #[error("Layer {index} ('{name}') has non-finite thickness, roughness or SLD")]
    NonFiniteLayer { index: usize, name: String },

    /// A log channel reports min above max.
    #[error("Log channel '{channel}' is inconsistent: min {min} > max {max}")]
    InconsistentLogChannel { channel: String, min: f64, max: f64 },
}

/// Fatal assembly errors. No records are produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("No reduced measurement was provided")]
    MissingMeasurement,

    #[error("Reflectivity record could not be built: {0}")]
    Measurement(#[source] BuildError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}
