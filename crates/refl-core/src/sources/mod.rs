//! Intermediate data contracts produced by the three readers.
//!
//! These are pure data. The readers in `refl-sources` build them; the
//! assembler only ever reads them.

mod measurement;
mod metadata;
mod model;

pub use measurement::{MeasurementSource, ReductionRun};
pub use metadata::{LogChannel, MetadataSource, MetadataValue};
pub use model::{
    Experiment, Layer, Material, ModelSoftware, ModelSource, ParameterCounts, ProbeCurve,
};
