use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Geometry;

/// Measured curve plus reduction provenance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MeasurementBlock {
    pub geometry: Option<Geometry>,
    pub reduction_time: Option<DateTime<Utc>>,
    pub reduction_version: Option<String>,
    pub q: Vec<f64>,
    pub r: Vec<f64>,
    pub dr: Vec<f64>,
    pub dq: Vec<f64>,
}

/// One reflectivity measurement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ReflectivityRecord {
    pub id: String,
    pub sample_id: Option<String>,
    pub environment_id: Option<String>,
    pub proposal_number: Option<String>,
    pub facility: Option<String>,
    pub laboratory: Option<String>,
    pub probe: Option<String>,
    pub technique: Option<String>,
    pub technique_description: Option<String>,
    pub instrument_name: Option<String>,
    pub run_number: Option<String>,
    pub run_title: Option<String>,
    pub run_start: Option<DateTime<Utc>>,
    pub raw_file_path: Option<String>,
    pub measurement: MeasurementBlock,
}
