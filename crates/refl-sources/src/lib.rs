//! # refl-sources
//!
//! Readers that turn files on disk into the source contracts of
//! `refl_core::sources`:
//!
//! - [`reduced`]: reduced reflectivity text -> `MeasurementSource`
//! - [`metadata`]: Parquet metadata directory -> `MetadataSource`
//! - [`model`]: refl1d/bumps JSON -> `ModelSource`
//!
//! The assembler never calls these; the CLI does, and hands the results over.

pub mod error;
pub mod metadata;
pub mod model;
pub mod reduced;

pub use error::SourceError;
pub use metadata::read_metadata_dir;
pub use model::{parse_model, read_model};
pub use reduced::{parse_reduced, read_reduced};
