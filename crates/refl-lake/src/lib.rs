//! # refl-lake
//!
//! Output sink for assembled records: one Parquet table per record type
//! (`reflectivity`, `sample`, `environment`, `model`), optional pretty JSON copies
//! under `json/`, and `assembly_report.json`.

pub mod error;
pub mod rows;
pub mod writer;

pub use error::LakeError;
pub use rows::{EnvironmentRow, MeasurementRow, ModelRow, ReflectivityRow, SampleRow};
pub use writer::{LakeWriter, RecordSet, WrittenFiles, table_fields, write_parquet};
