//! Row structs for the output tables.
//!
//! One row per record. Timestamps are stored as UTC microseconds (see
//! `refl_core::arrow_serde`); the substrate snapshot and per-field
//! provenance are JSON strings so the table schemas stay flat and stable.

use chrono::{DateTime, Utc};
use refl_core::arrow_serde;
use refl_core::provenance::Provenance;
use refl_core::records::{
    EnvironmentRecord, LayerRecord, MeasurementBlock, ModelRecord, ReflectivityRecord, SampleRecord,
};
use serde::{Deserialize, Serialize};

/// Nested `reflectivity` struct column of the reflectivity table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementRow {
    pub geometry: Option<String>,
    #[serde(with = "arrow_serde::timestamp_micros_utc_option")]
    pub reduction_time: Option<DateTime<Utc>>,
    pub reduction_version: Option<String>,
    pub q: Vec<f64>,
    pub r: Vec<f64>,
    pub dr: Vec<f64>,
    pub dq: Vec<f64>,
}

impl From<&MeasurementBlock> for MeasurementRow {
    fn from(block: &MeasurementBlock) -> Self {
        Self {
            geometry: block.geometry.map(|g| g.as_str().to_string()),
            reduction_time: block.reduction_time,
            reduction_version: block.reduction_version.clone(),
            q: block.q.clone(),
            r: block.r.clone(),
            dr: block.dr.clone(),
            dq: block.dq.clone(),
        }
    }
}

/// A row in `reflectivity.parquet`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReflectivityRow {
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
    #[serde(with = "arrow_serde::timestamp_micros_utc_option")]
    pub run_start: Option<DateTime<Utc>>,
    pub raw_file_path: Option<String>,
    pub reflectivity: MeasurementRow,
    pub provenance: Option<String>,
    #[serde(with = "arrow_serde::timestamp_micros_utc")]
    pub assembled_at: DateTime<Utc>,
}

impl ReflectivityRow {
    /// # Errors
    ///
    /// Fails if the provenance cannot be serialized.
    pub fn new(
        record: &ReflectivityRecord,
        provenance: Option<&Provenance>,
        assembled_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id.clone(),
            sample_id: record.sample_id.clone(),
            environment_id: record.environment_id.clone(),
            proposal_number: record.proposal_number.clone(),
            facility: record.facility.clone(),
            laboratory: record.laboratory.clone(),
            probe: record.probe.clone(),
            technique: record.technique.clone(),
            technique_description: record.technique_description.clone(),
            instrument_name: record.instrument_name.clone(),
            run_number: record.run_number.clone(),
            run_title: record.run_title.clone(),
            run_start: record.run_start,
            raw_file_path: record.raw_file_path.clone(),
            reflectivity: MeasurementRow::from(&record.measurement),
            provenance: provenance.map(serde_json::to_string).transpose()?,
            assembled_at,
        })
    }
}

/// A row in `sample.parquet`. Layers are a list-of-struct column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleRow {
    pub id: String,
    pub description: Option<String>,
    pub main_composition: Option<String>,
    pub geometry: Option<String>,
    pub layers: Vec<LayerRecord>,
    pub substrate: Option<String>,
    pub dataset_index: Option<u32>,
    pub experiment_name: Option<String>,
    pub experiment_count: Option<u32>,
    pub environment_ids: Vec<String>,
    pub provenance: Option<String>,
    #[serde(with = "arrow_serde::timestamp_micros_utc")]
    pub assembled_at: DateTime<Utc>,
}

impl SampleRow {
    /// # Errors
    ///
    /// Fails if the substrate or provenance cannot be serialized.
    pub fn new(
        record: &SampleRecord,
        provenance: Option<&Provenance>,
        assembled_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id.clone(),
            description: record.description.clone(),
            main_composition: record.main_composition.clone(),
            geometry: record.geometry.clone(),
            layers: record.layers.clone(),
            substrate: record.substrate.as_ref().map(serde_json::to_string).transpose()?,
            dataset_index: record.dataset_index,
            experiment_name: record.experiment_name.clone(),
            experiment_count: record.experiment_count,
            environment_ids: record.environment_ids.clone(),
            provenance: provenance.map(serde_json::to_string).transpose()?,
            assembled_at,
        })
    }
}

/// A row in `environment.parquet`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentRow {
    pub id: String,
    pub sample_id: Option<String>,
    pub description: Option<String>,
    pub ambient_medium: Option<String>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub measurement_ids: Vec<String>,
    pub provenance: Option<String>,
    #[serde(with = "arrow_serde::timestamp_micros_utc")]
    pub assembled_at: DateTime<Utc>,
}

impl EnvironmentRow {
    /// # Errors
    ///
    /// Fails if the provenance cannot be serialized.
    pub fn new(
        record: &EnvironmentRecord,
        provenance: Option<&Provenance>,
        assembled_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id.clone(),
            sample_id: record.sample_id.clone(),
            description: record.description.clone(),
            ambient_medium: record.ambient_medium.clone(),
            temperature: record.temperature,
            pressure: record.pressure,
            relative_humidity: record.relative_humidity,
            measurement_ids: record.measurement_ids.clone(),
            provenance: provenance.map(serde_json::to_string).transpose()?,
            assembled_at,
        })
    }
}

/// A row in `model.parquet`. The model document stays a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRow {
    pub id: String,
    pub model_name: Option<String>,
    pub model_file_path: Option<String>,
    pub software: Option<String>,
    pub software_version: Option<String>,
    pub schema_version: Option<String>,
    pub num_experiments: u32,
    pub dataset_index: Option<u32>,
    pub num_parameters: Option<u32>,
    pub num_free_parameters: Option<u32>,
    pub layers: Vec<LayerRecord>,
    pub model_json: Option<String>,
    pub measurement_ids: Vec<String>,
    pub provenance: Option<String>,
    #[serde(with = "arrow_serde::timestamp_micros_utc")]
    pub assembled_at: DateTime<Utc>,
}

impl ModelRow {
    /// # Errors
    ///
    /// Fails if the provenance cannot be serialized.
    pub fn new(
        record: &ModelRecord,
        provenance: Option<&Provenance>,
        assembled_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id.clone(),
            model_name: record.model_name.clone(),
            model_file_path: record.model_file_path.clone(),
            software: record.software.clone(),
            software_version: record.software_version.clone(),
            schema_version: record.schema_version.clone(),
            num_experiments: record.num_experiments,
            dataset_index: record.dataset_index,
            num_parameters: record.num_parameters,
            num_free_parameters: record.num_free_parameters,
            layers: record.layers.clone(),
            model_json: record.model_json.clone(),
            measurement_ids: record.measurement_ids.clone(),
            provenance: provenance.map(serde_json::to_string).transpose()?,
            assembled_at,
        })
    }
}
