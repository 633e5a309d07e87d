//! Serializable summary of one assembly call.
//!
//! The report travels with the records to the output sink and is what the
//! CLI prints. It holds identifiers rather than whole records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{AssemblyStatus, SelectionMode};
use crate::provenance::{Provenance, ReviewFlag};

/// Score of one candidate experiment during auto-detection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ExperimentScore {
    pub index: usize,
    pub name: Option<String>,
    /// Mean relative deviation; `None` when no observed point overlapped.
    pub score: Option<f64>,
    pub overlapping_points: usize,
}

/// How the co-refinement dataset was chosen.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SelectionReport {
    pub selected_index: usize,
    pub mode: SelectionMode,
    pub experiment_count: usize,
    #[serde(default)]
    pub scores: Vec<ExperimentScore>,
}

/// Provenance of each record that was produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProvenanceReport {
    pub reflectivity: Option<Provenance>,
    pub sample: Option<Provenance>,
    pub environment: Option<Provenance>,
    #[serde(default)]
    pub model: Option<Provenance>,
}

/// Summary of one assembly call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AssemblyReport {
    pub status: AssemblyStatus,
    pub instrument: Option<String>,
    pub reflectivity_id: Option<String>,
    pub sample_id: Option<String>,
    pub environment_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    pub selection: Option<SelectionReport>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub review_flags: Vec<ReviewFlag>,
    pub needs_human_review: bool,
    pub provenance: ProvenanceReport,
    pub assembled_at: DateTime<Utc>,
}
