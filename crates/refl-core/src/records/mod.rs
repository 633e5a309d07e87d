//! Assembled record types.
//!
//! Identifiers are UUID v4 strings generated per assembly call. Foreign keys
//! are plain identifier strings; `refl-assembler` links them symmetrically.

mod environment;
mod model;
mod reflectivity;
mod sample;

pub use environment::EnvironmentRecord;
pub use model::ModelRecord;
pub use reflectivity::{MeasurementBlock, ReflectivityRecord};
pub use sample::{LayerRecord, SampleRecord};
