//! # refl-assembler
//!
//! Turns a reduced measurement, optional Parquet metadata and an optional
//! fitted model into linked Reflectivity, Sample, Environment and Model records.
//!
//! Everything here is pure: sources are parsed by `refl-sources`, records
//! are written by `refl-lake`.

pub mod builders;
pub mod error;
pub mod instruments;
pub mod orchestrator;
pub mod selector;
pub mod validation;

pub use error::{AssemblyError, BuildError, SelectionError};
pub use instruments::InstrumentRegistry;
pub use orchestrator::{Assembler, AssemblyFailure, AssemblyInputs, AssemblyOutcome, AssemblyResult};
pub use selector::{Selection, select_dataset};
pub use validation::validate_links;
