//! Central schema registry.
//!
//! The `SchemaRegistry` builds JSON Schemas from refl-core types at
//! construction time using [`schemars::schema_for!`] and validates values
//! with `jsonschema`.

use std::collections::HashMap;

use schemars::schema_for;
use serde::Serialize;

use crate::error::SchemaError;

/// Named JSON Schemas of the record, provenance and report types.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

/// Insert a schema into the map, converting the `schemars` output to a
/// `serde_json::Value`.
macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        $map.insert(
            $name,
            serde_json::to_value(schema_for!($ty))
                .map_err(|e| SchemaError::Generation(format!("{}: {e}", $name)))?,
        );
    };
}

impl SchemaRegistry {
    /// Build the registry.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Generation`] if a generated schema cannot be
    /// converted to JSON.
    pub fn new() -> Result<Self, SchemaError> {
        let mut schemas = HashMap::new();

        // --- Records (4) ---
        register!(schemas, "reflectivity", refl_core::records::ReflectivityRecord);
        register!(schemas, "sample", refl_core::records::SampleRecord);
        register!(schemas, "environment", refl_core::records::EnvironmentRecord);
        register!(schemas, "model", refl_core::records::ModelRecord);

        // --- Side data (3) ---
        register!(schemas, "review_flag", refl_core::provenance::ReviewFlag);
        register!(schemas, "provenance", refl_core::provenance::Provenance);
        register!(schemas, "assembly_report", refl_core::report::AssemblyReport);

        // --- Configuration (1) ---
        register!(schemas, "instrument_profile", refl_core::instrument::InstrumentProfile);

        Ok(Self { schemas })
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` if validation produces errors.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        let errors: Vec<String> = validator.iter_errors(instance).map(|e| format!("{e}")).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// Serialize `value` and validate it against a named schema.
    ///
    /// # Errors
    ///
    /// As [`Self::validate`]; serialization failures are reported as
    /// `SchemaError::Generation`.
    pub fn validate_value<T: Serialize>(&self, name: &str, value: &T) -> Result<(), SchemaError> {
        let json = serde_json::to_value(value)
            .map_err(|e| SchemaError::Generation(format!("{name}: {e}")))?;
        self.validate(name, &json)
    }

    /// All registered schema names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use refl_core::enums::{AssemblyStatus, Geometry, RecordKind, SourceTag};
    use refl_core::provenance::{Provenance, ReviewFlag};
    use refl_core::records::{EnvironmentRecord, MeasurementBlock, ModelRecord, ReflectivityRecord};
    use refl_core::report::{AssemblyReport, ProvenanceReport};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new().unwrap()
    }

    fn reflectivity() -> ReflectivityRecord {
        ReflectivityRecord {
            id: "6f1c1b8e-4a8e-4c1e-9a37-5a1d7a3b2c10".into(),
            sample_id: None,
            environment_id: None,
            proposal_number: Some("IPTS-34347".into()),
            facility: Some("SNS".into()),
            laboratory: Some("ORNL".into()),
            probe: Some("neutrons".into()),
            technique: Some("reflectivity".into()),
            technique_description: None,
            instrument_name: Some("REF_L".into()),
            run_number: Some("218386".into()),
            run_title: None,
            run_start: Some(Utc::now()),
            raw_file_path: None,
            measurement: MeasurementBlock {
                geometry: Some(Geometry::FrontReflection),
                reduction_time: None,
                reduction_version: None,
                q: vec![0.01, 0.02],
                r: vec![1.0, 0.5],
                dr: vec![0.1, 0.05],
                dq: vec![0.001, 0.001],
            },
        }
    }

    #[test]
    fn registry_lists_sorted_names() {
        let reg = registry();
        assert_eq!(reg.schema_count(), 8);
        assert_eq!(
            reg.list(),
            vec![
                "assembly_report",
                "environment",
                "instrument_profile",
                "model",
                "provenance",
                "reflectivity",
                "review_flag",
                "sample",
            ]
        );
    }

    #[test]
    fn get_nonexistent_schema() {
        assert!(registry().get("nonexistent").is_none());
    }

    #[test]
    fn validate_valid_reflectivity() {
        assert!(registry().validate_value("reflectivity", &reflectivity()).is_ok());
    }

    #[test]
    fn validate_rejects_missing_measurement() {
        let mut json = serde_json::to_value(reflectivity()).unwrap();
        json.as_object_mut().unwrap().remove("measurement");
        let result = registry().validate("reflectivity", &json);
        if let Err(SchemaError::ValidationFailed { errors }) = result {
            assert!(!errors.is_empty());
        } else {
            panic!("Expected ValidationFailed");
        }
    }

    #[test]
    fn validate_rejects_invalid_geometry() {
        let mut json = serde_json::to_value(reflectivity()).unwrap();
        json["measurement"]["geometry"] = serde_json::json!("sideways");
        assert!(registry().validate("reflectivity", &json).is_err());
    }

    #[test]
    fn validate_environment_and_flag() {
        let reg = registry();
        let env = EnvironmentRecord {
            id: "e".into(),
            sample_id: None,
            description: Some("Standard conditions".into()),
            ambient_medium: None,
            temperature: Some(295.0),
            pressure: None,
            relative_humidity: None,
            measurement_ids: vec!["r".into()],
        };
        assert!(reg.validate_value("environment", &env).is_ok());
        let flag = ReviewFlag::new(
            RecordKind::Environment,
            "pressure",
            "parquet metadata not provided",
        );
        assert!(reg.validate_value("review_flag", &flag).is_ok());
        let unknown_record = serde_json::json!({"record": "detector", "field": "x", "reason": "y"});
        assert!(reg.validate("review_flag", &unknown_record).is_err());
    }

    #[test]
    fn validate_model_record() {
        let model = ModelRecord {
            id: "m".into(),
            model_name: None,
            model_file_path: None,
            software: Some("bumps".into()),
            software_version: None,
            schema_version: Some("bumps-draft-03".into()),
            num_experiments: 1,
            dataset_index: Some(0),
            num_parameters: None,
            num_free_parameters: None,
            layers: Vec::new(),
            model_json: None,
            measurement_ids: vec!["r".into()],
        };
        let reg = registry();
        assert!(reg.validate_value("model", &model).is_ok());

        let mut json = serde_json::to_value(&model).unwrap();
        json["num_experiments"] = serde_json::json!(-1);
        assert!(reg.validate("model", &json).is_err());
    }

    #[test]
    fn validate_assembly_report() {
        let mut provenance = Provenance::new();
        provenance.from_source("run_number", SourceTag::ReducedHeader);
        provenance.unresolved("facility", "parquet metadata not provided");
        let report = AssemblyReport {
            status: AssemblyStatus::Success,
            instrument: Some("REF_L".into()),
            reflectivity_id: Some("r".into()),
            sample_id: None,
            environment_id: None,
            model_id: None,
            selection: None,
            warnings: Vec::new(),
            errors: Vec::new(),
            review_flags: Vec::new(),
            needs_human_review: false,
            provenance: ProvenanceReport {
                reflectivity: Some(provenance.clone()),
                ..ProvenanceReport::default()
            },
            assembled_at: Utc::now(),
        };
        let reg = registry();
        assert!(reg.validate_value("assembly_report", &report).is_ok());
        assert!(reg.validate_value("provenance", &provenance).is_ok());
    }

    #[test]
    fn validate_nonexistent_schema_returns_not_found() {
        let result = registry().validate("bogus", &serde_json::json!({}));
        assert!(matches!(result, Err(SchemaError::NotFound(_))));
    }
}
