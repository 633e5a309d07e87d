//! End-to-end assembly over in-memory sources.

use pretty_assertions::assert_eq;
use refl_assembler::{
    Assembler, AssemblyError, AssemblyInputs, AssemblyOutcome, InstrumentRegistry, SelectionError,
    validate_links,
};
use refl_config::AssemblyConfig;
use refl_core::enums::{AssemblyStatus, RecordKind, SelectionMode, SourceTag};
use refl_core::ids::is_record_id;
use refl_core::instrument::InstrumentProfile;
use refl_core::provenance::FieldState;
use refl_core::sources::{
    Experiment, Layer, LogChannel, Material, MeasurementSource, MetadataSource, MetadataValue,
    ModelSoftware, ModelSource, ProbeCurve,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn measurement() -> MeasurementSource {
    let q: Vec<f64> = (1..=15).map(|i| f64::from(i) * 0.01).collect();
    let r: Vec<f64> = q.iter().map(|q| 1.0 / (1.0 + 100.0 * q)).collect();
    let n = q.len();
    MeasurementSource {
        source_path: Some(
            "/SNS/REF_L/IPTS-34347/shared/autoreduce/REF_L_218386_combined.txt".into(),
        ),
        proposal_id: Some("IPTS-34347".into()),
        run_number: Some(218_386),
        run_title: Some("Cu/Ti on Si in THF".into()),
        reduction_time: chrono::DateTime::from_timestamp(1_741_950_000, 0),
        reduction_version: Some("quicknxs v4.0".into()),
        scattering_angle: Some(0.6),
        dr: r.iter().map(|r| r * 0.05).collect(),
        dq: vec![0.0005; n],
        q,
        r,
        ..MeasurementSource::default()
    }
}

fn layer(name: &str, thickness: f64) -> Layer {
    Layer {
        name: name.into(),
        thickness,
        interface: 3.0,
        material: Material {
            name: name.into(),
            rho: 1.0,
            irho: 0.0,
        },
    }
}

fn stack() -> Vec<Layer> {
    vec![
        layer("THF", 10.0),
        layer("film", 37.4),
        layer("Cu", 481.9),
        layer("Ti", 36.7),
        layer("Si", 0.0),
    ]
}

/// Two experiments; the second one's probe equals the observed curve.
fn co_refined_model(observed: &MeasurementSource) -> ModelSource {
    let off = ProbeCurve {
        q: observed.q.clone(),
        r: observed.r.iter().map(|r| r * 3.0).collect(),
    };
    let exact = ProbeCurve {
        q: observed.q.clone(),
        r: observed.r.clone(),
    };
    ModelSource::new(vec![
        Experiment {
            name: Some("d-THF".into()),
            layers: stack(),
            probe: Some(off),
        },
        Experiment {
            name: Some("THF".into()),
            layers: stack(),
            probe: Some(exact),
        },
    ])
    .unwrap()
    .with_name("cu_thf")
    .with_software(ModelSoftware {
        name: "refl1d".into(),
        version: Some("1.0.0a12".into()),
        schema_version: Some("bumps-draft-02".into()),
    })
}

fn metadata() -> MetadataSource {
    let mut metadata = MetadataSource::default();
    metadata.insert("metadata", "instrument_id", MetadataValue::String("BL4B".into()));
    metadata.insert("metadata", "run_number", MetadataValue::Integer(218_386));
    metadata.insert("metadata", "title", MetadataValue::String("Cu/Ti electrode".into()));
    metadata.insert(
        "metadata",
        "start_time",
        MetadataValue::String("2025-03-14T09:26:53Z".into()),
    );
    metadata.insert(
        "metadata",
        "source_path",
        MetadataValue::String("/SNS/REF_L/IPTS-34347/nexus/REF_L_218386.nxs.h5".into()),
    );
    metadata.insert(
        "metadata",
        "experiment_identifier",
        MetadataValue::String("IPTS-34347".into()),
    );
    metadata.logs.insert(
        "SampleTemp".into(),
        LogChannel::new(Some(295.0), Some(294.8), Some(295.2)),
    );
    metadata.logs.insert("Pressure".into(), LogChannel::new(Some(101_325.0), None, None));
    metadata.logs.insert("RelativeHumidity".into(), LogChannel::new(Some(45.0), None, None));
    metadata
}

fn unresolved_environment_fields(outcome: &AssemblyOutcome) -> Vec<String> {
    let mut fields: Vec<String> = outcome
        .result()
        .unwrap()
        .review_flags
        .iter()
        .filter(|f| f.record == RecordKind::Environment)
        .map(|f| f.field.clone())
        .collect();
    fields.sort_unstable();
    fields
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[test]
fn full_inputs_produce_linked_records() {
    let observed = measurement();
    let model = co_refined_model(&observed);
    let metadata = metadata();
    let outcome = Assembler::default().assemble(
        &AssemblyInputs::new(&observed)
            .with_metadata(&metadata)
            .with_model(&model),
    );

    assert_eq!(outcome.status(), AssemblyStatus::Success);
    let result = outcome.into_result().unwrap();
    let sample = result.sample.as_ref().unwrap();
    let environment = result.environment.as_ref().unwrap();

    assert_eq!(result.instrument, "REF_L");
    assert!(is_record_id(&result.reflectivity.id));
    assert_eq!(result.reflectivity.sample_id.as_deref(), Some(sample.id.as_str()));
    assert_eq!(result.reflectivity.environment_id.as_deref(), Some(environment.id.as_str()));
    assert_eq!(sample.environment_ids, vec![environment.id.clone()]);
    assert_eq!(environment.sample_id.as_deref(), Some(sample.id.as_str()));
    assert_eq!(environment.measurement_ids, vec![result.reflectivity.id.clone()]);
    assert!(validate_links(&result).is_empty());

    assert_eq!(result.reflectivity.run_title.as_deref(), Some("Cu/Ti electrode"));
    assert_eq!(environment.temperature, Some(295.0));
    assert_eq!(environment.ambient_medium.as_deref(), Some("THF"));
    assert_eq!(
        environment.description.as_deref(),
        Some("T=295.0K, P=101325.0Pa, RH=45.0%")
    );

    let selection = result.selection.as_ref().unwrap();
    assert_eq!(selection.selected_index, 1);
    assert_eq!(selection.mode, SelectionMode::AutoDetected);
    assert_eq!(selection.scores[1].score, Some(0.0));
    assert_eq!(sample.dataset_index, Some(1));
    assert_eq!(sample.experiment_name.as_deref(), Some("THF"));
    assert_eq!(sample.main_composition.as_deref(), Some("Cu"));
    assert_eq!(sample.substrate.as_ref().map(|s| s.name.as_str()), Some("Si"));

    let model = result.model.as_ref().unwrap();
    assert_eq!(model.measurement_ids, vec![result.reflectivity.id.clone()]);
    assert_eq!(model.model_name.as_deref(), Some("cu_thf"));
    assert_eq!(model.software.as_deref(), Some("refl1d"));
    assert_eq!(model.num_experiments, 2);
    assert_eq!(model.dataset_index, Some(1));
    assert_eq!(model.layers.len(), 5);
    assert_eq!(result.report().model_id.as_deref(), Some(model.id.as_str()));
    assert!(result.summary().starts_with("success: 4 record(s)"));

    // only the generic "film" layer name needs a look
    let flagged: Vec<String> = result.review_flags.iter().map(|f| f.qualified_field()).collect();
    assert_eq!(flagged, vec!["sample.layers[1].name".to_string()]);
    assert!(result.needs_human_review());
}

#[test]
fn measurement_only_still_produces_all_records() {
    let observed = measurement();
    let outcome = Assembler::default().assemble(&AssemblyInputs::new(&observed));

    assert_eq!(outcome.status(), AssemblyStatus::Success);
    let result = outcome.result().unwrap();
    assert!(result.sample.is_some());
    assert!(result.environment.is_some());
    assert_eq!(
        result.sample.as_ref().unwrap().description.as_deref(),
        Some("Cu/Ti on Si in THF")
    );
    assert!(
        result
            .review_flags
            .iter()
            .any(|f| f.to_string() == "reflectivity.raw_file_path: parquet metadata not provided")
    );
    assert!(result.model.is_none());
    assert_eq!(result.report().model_id, None);
}

#[test]
fn no_metadata_flags_exactly_the_environment_conditions() {
    let observed = measurement();
    let model = co_refined_model(&observed);
    let outcome = Assembler::default().assemble(&AssemblyInputs::new(&observed).with_model(&model));

    assert!(outcome.result().unwrap().environment.is_some());
    assert_eq!(
        unresolved_environment_fields(&outcome),
        vec!["pressure", "relative_humidity", "temperature"]
    );
}

#[test]
fn measurement_only_flags_exactly_the_environment_conditions() {
    let observed = measurement();
    let outcome = Assembler::default().assemble(&AssemblyInputs::new(&observed));

    let result = outcome.result().unwrap();
    assert_eq!(result.environment.as_ref().unwrap().ambient_medium, None);
    assert_eq!(
        unresolved_environment_fields(&outcome),
        vec!["pressure", "relative_humidity", "temperature"]
    );
    assert_eq!(
        result
            .provenance
            .environment
            .as_ref()
            .unwrap()
            .get("ambient_medium"),
        Some(&FieldState::Unresolved {
            reason: "model not provided".into()
        })
    );
}

#[test]
fn missing_measurement_fails() {
    let outcome = Assembler::default().assemble(&AssemblyInputs::default());
    let failure = outcome.into_result().unwrap_err();
    assert_eq!(failure.error, AssemblyError::MissingMeasurement);
    assert_eq!(failure.report().status, AssemblyStatus::Failure);
}

#[test]
fn invalid_measurement_fails() {
    let mut observed = measurement();
    observed.r.pop();
    let outcome = Assembler::default().assemble(&AssemblyInputs::new(&observed));
    assert_eq!(outcome.status(), AssemblyStatus::Failure);
    assert!(outcome.result().is_none());
}

#[test]
fn explicit_index_out_of_range_produces_no_records() {
    let observed = measurement();
    let model = ModelSource::new(vec![
        Experiment {
            layers: stack(),
            ..Experiment::default()
        };
        3
    ])
    .unwrap();
    let outcome = Assembler::default().assemble(
        &AssemblyInputs::new(&observed)
            .with_model(&model)
            .with_dataset_index(5),
    );

    let report = outcome.report();
    assert_eq!(report.status, AssemblyStatus::Failure);
    assert_eq!(report.reflectivity_id, None);
    assert_eq!(report.sample_id, None);
    assert_eq!(
        outcome.into_result().unwrap_err().error,
        AssemblyError::Selection(SelectionError::IndexOutOfRange { index: 5, count: 3 })
    );
}

#[test]
fn failing_environment_is_partial_success() {
    let observed = measurement();
    let mut metadata = metadata();
    metadata.logs.insert(
        "SampleTemp".into(),
        LogChannel::new(Some(295.0), Some(296.0), Some(294.0)),
    );
    let outcome =
        Assembler::default().assemble(&AssemblyInputs::new(&observed).with_metadata(&metadata));

    assert_eq!(outcome.status(), AssemblyStatus::PartialSuccess);
    let result = outcome.result().unwrap();
    assert!(result.environment.is_none());
    assert_eq!(result.reflectivity.environment_id, None);
    assert!(result.errors[0].starts_with("environment:"));
    assert!(
        result
            .review_flags
            .iter()
            .any(|f| f.qualified_field() == "reflectivity.environment_id")
    );
}

#[test]
fn non_finite_layer_omits_sample_and_model() {
    let observed = measurement();
    let mut model = co_refined_model(&observed);
    model.experiments[1].layers[2].thickness = f64::NAN;
    let outcome = Assembler::default().assemble(&AssemblyInputs::new(&observed).with_model(&model));

    assert_eq!(outcome.status(), AssemblyStatus::PartialSuccess);
    let result = outcome.result().unwrap();
    assert!(result.sample.is_none());
    assert!(result.model.is_none());
    assert!(result.environment.is_some());
    assert_eq!(result.reflectivity.sample_id, None);
    assert!(result.errors.iter().any(|e| e.starts_with("sample:")));
    assert!(result.errors.iter().any(|e| e.starts_with("model:")));
    assert!(
        result
            .review_flags
            .iter()
            .any(|f| f.to_string() == "reflectivity.sample_id: sample record was not produced")
    );
    assert!(
        result
            .review_flags
            .iter()
            .any(|f| f.to_string() == "environment.sample_id: sample record was not produced")
    );
    assert!(validate_links(result).is_empty());
    let report = outcome.report();
    assert_eq!(report.sample_id, None);
    assert_eq!(report.model_id, None);
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn environment_description_override_replaces_derived_text() {
    let observed = measurement();
    let metadata = metadata();
    let outcome = Assembler::default().assemble(
        &AssemblyInputs::new(&observed)
            .with_metadata(&metadata)
            .with_environment_description("operando cycling"),
    );
    let result = outcome.result().unwrap();
    let environment = result.environment.as_ref().unwrap();
    assert_eq!(environment.description.as_deref(), Some("operando cycling"));
    assert_eq!(
        result.provenance.environment.as_ref().unwrap().get("description"),
        Some(&FieldState::FromSource {
            source: SourceTag::Caller
        })
    );
}

#[test]
fn unknown_instrument_uses_generic_profile() {
    let mut observed = measurement();
    observed.source_path = Some("/data/candor/run42.txt".into());
    let outcome = Assembler::default().assemble(&AssemblyInputs::new(&observed));
    let result = outcome.result().unwrap();
    assert_eq!(result.instrument, "generic");
    assert!(result.warnings.iter().any(|w| w.contains("generic profile")));
    assert_eq!(result.reflectivity.facility, None);
}

#[test]
fn configured_profile_is_used() {
    let mut candor = InstrumentProfile::generic();
    candor.name = "CANDOR".into();
    candor.facility = Some("NCNR".into());
    let assembler = Assembler::new(
        InstrumentRegistry::builtin().with_overrides(&[candor]),
        AssemblyConfig::default(),
    );

    let mut observed = measurement();
    observed.source_path = Some("/data/CANDOR/run42.txt".into());
    let result = assembler
        .assemble(&AssemblyInputs::new(&observed))
        .into_result()
        .unwrap();
    assert_eq!(result.reflectivity.facility.as_deref(), Some("NCNR"));
}

#[test]
fn dataset_index_without_model_warns() {
    let observed = measurement();
    let result = Assembler::default()
        .assemble(&AssemblyInputs::new(&observed).with_dataset_index(2))
        .into_result()
        .unwrap();
    assert!(result.warnings.iter().any(|w| w.contains("dataset index 2 ignored")));
}

#[test]
fn report_mirrors_result() {
    let observed = measurement();
    let metadata = metadata();
    let result = Assembler::default()
        .assemble(&AssemblyInputs::new(&observed).with_metadata(&metadata))
        .into_result()
        .unwrap();
    let report = result.report();
    assert_eq!(report.reflectivity_id.as_deref(), Some(result.reflectivity.id.as_str()));
    assert_eq!(report.needs_human_review, result.needs_human_review());
    assert_eq!(report.review_flags, result.review_flags);
    assert!(report.provenance.sample.is_some());
    assert!(result.summary().starts_with("success: 3 record(s) for REF_L"));
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn repeated_runs_differ_only_in_identifiers() {
    let observed = measurement();
    let model = co_refined_model(&observed);
    let metadata = metadata();
    let inputs = AssemblyInputs::new(&observed)
        .with_metadata(&metadata)
        .with_model(&model);
    let assembler = Assembler::default();

    let mut first = assembler.assemble(&inputs).into_result().unwrap();
    let mut second = assembler.assemble(&inputs).into_result().unwrap();
    assert_ne!(first.reflectivity.id, second.reflectivity.id);

    for result in [&mut first, &mut second] {
        result.reflectivity.id.clear();
        result.reflectivity.sample_id = None;
        result.reflectivity.environment_id = None;
        if let Some(sample) = result.sample.as_mut() {
            sample.id.clear();
            sample.environment_ids.clear();
        }
        if let Some(env) = result.environment.as_mut() {
            env.id.clear();
            env.sample_id = None;
            env.measurement_ids.clear();
        }
        if let Some(model) = result.model.as_mut() {
            model.id.clear();
            model.measurement_ids.clear();
        }
        result.assembled_at = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
    }
    assert_eq!(first, second);
}
