use chrono::{DateTime, Utc};
use refl_config::AssemblyConfig;
use refl_core::enums::{Geometry, RecordKind, SourceTag};
use refl_core::ids::new_record_id;
use refl_core::instrument::InstrumentProfile;
use refl_core::records::{MeasurementBlock, ReflectivityRecord};
use refl_core::sources::{MeasurementSource, MetadataSource};

use super::{BuildOutput, FieldLedger, METADATA_NOT_PROVIDED, missing_reason, run_title};
use crate::error::BuildError;

/// Build the Reflectivity record.
///
/// The measurement arrays are copied unchanged. Identity fields come from the
/// metadata tables first, then the reduced header; facility-level fields fall
/// back to the instrument profile defaults.
///
/// # Errors
///
/// Returns [`BuildError::InvalidMeasurement`] when the measurement arrays are
/// empty or of unequal length.
pub fn build_reflectivity(
    measurement: &MeasurementSource,
    metadata: Option<&MetadataSource>,
    profile: &InstrumentProfile,
    config: &AssemblyConfig,
) -> Result<BuildOutput<ReflectivityRecord>, BuildError> {
    measurement.validate()?;

    let mut ledger = FieldLedger::new(RecordKind::Reflectivity);
    let meta_text = |table: &str, field: &str| metadata.and_then(|m| m.text(table, field));

    let proposal_number = ledger.pick(
        "proposal_number",
        [
            (meta_text("metadata", "experiment_identifier"), SourceTag::Metadata),
            (measurement.proposal_id.clone(), SourceTag::ReducedHeader),
        ],
        || missing_reason(metadata, "proposal number"),
    );

    let run_number = ledger.pick(
        "run_number",
        [
            (meta_text("metadata", "run_number"), SourceTag::Metadata),
            (measurement.run_number.map(|n| n.to_string()), SourceTag::ReducedHeader),
        ],
        || missing_reason(metadata, "run number"),
    );

    let run_title = match run_title(measurement, metadata) {
        Some((title, source)) => {
            ledger.from_source("run_title", source);
            Some(title)
        }
        None => {
            ledger.unresolved("run_title", missing_reason(metadata, "run title"));
            None
        }
    };

    let metadata_start = metadata_timestamp(&mut ledger, metadata, "start_time");
    let run_start = ledger.pick(
        "run_start",
        [
            (metadata_start, SourceTag::Metadata),
            (measurement.run_start, SourceTag::ReducedHeader),
        ],
        || missing_reason(metadata, "run start time"),
    );

    let raw_file_path = ledger.pick(
        "raw_file_path",
        [(meta_text("metadata", "source_path"), SourceTag::Metadata)],
        || metadata_only_reason(metadata),
    );

    let instrument_name = {
        let from_metadata =
            meta_text("metadata", "instrument_id").or_else(|| meta_text("instrument", "name"));
        if let Some(name) = from_metadata {
            ledger.from_source("instrument_name", SourceTag::Metadata);
            Some(name)
        } else if profile.is_generic() {
            ledger.unresolved("instrument_name", metadata_only_reason(metadata));
            None
        } else {
            ledger.defaulted(
                "instrument_name",
                SourceTag::InstrumentProfile,
                "instrument identified from the reduced file path",
            );
            Some(profile.name.clone())
        }
    };

    let facility = match meta_text("instrument", "facility") {
        Some(facility) => {
            ledger.from_source("facility", SourceTag::Metadata);
            Some(facility)
        }
        None => profile_default(
            &mut ledger,
            metadata,
            profile,
            "facility",
            profile.facility.as_ref(),
        ),
    };
    let laboratory = profile_default(
        &mut ledger,
        metadata,
        profile,
        "laboratory",
        profile.laboratory.as_ref(),
    );
    let probe = profile_default(&mut ledger, metadata, profile, "probe", profile.probe.as_ref());
    let technique = profile_default(
        &mut ledger,
        metadata,
        profile,
        "technique",
        profile.technique.as_ref(),
    );
    let technique_description = profile_default(
        &mut ledger,
        metadata,
        profile,
        "technique_description",
        profile.technique_description.as_ref(),
    );

    let measurement_block = measurement_block(&mut ledger, measurement);
    dataset_warnings(&mut ledger, measurement, config);

    let record = ReflectivityRecord {
        id: new_record_id(),
        sample_id: None,
        environment_id: None,
        proposal_number,
        facility,
        laboratory,
        probe,
        technique,
        technique_description,
        instrument_name,
        run_number,
        run_title,
        run_start,
        raw_file_path,
        measurement: measurement_block,
    };
    tracing::debug!(id = %record.id, points = measurement.len(), "built reflectivity record");
    Ok(ledger.finish(record))
}

fn metadata_only_reason(metadata: Option<&MetadataSource>) -> String {
    if metadata.is_some() {
        "not present in parquet metadata".to_string()
    } else {
        METADATA_NOT_PROVIDED.to_string()
    }
}

/// A metadata timestamp; one that fails to parse is a warning and yields `None`.
fn metadata_timestamp(
    ledger: &mut FieldLedger,
    metadata: Option<&MetadataSource>,
    field: &str,
) -> Option<DateTime<Utc>> {
    let value = metadata?.value("metadata", field)?;
    let parsed = value.as_timestamp();
    if parsed.is_none() {
        ledger.warn(format!(
            "metadata.{field} value {value:?} is not a recognised timestamp; \
             using the reduced header"
        ));
    }
    parsed
}

fn profile_default(
    ledger: &mut FieldLedger,
    metadata: Option<&MetadataSource>,
    profile: &InstrumentProfile,
    field: &str,
    value: Option<&String>,
) -> Option<String> {
    if let Some(value) = value {
        ledger.defaulted(
            field,
            SourceTag::InstrumentProfile,
            format!("{} profile default", profile.name),
        );
        return Some(value.clone());
    }
    let reason = if metadata.is_none() {
        METADATA_NOT_PROVIDED.to_string()
    } else {
        format!("instrument profile '{}' has no default", profile.name)
    };
    ledger.unresolved(field, reason);
    None
}

fn measurement_block(
    ledger: &mut FieldLedger,
    measurement: &MeasurementSource,
) -> MeasurementBlock {
    let geometry = measurement.scattering_angle.and_then(Geometry::from_scattering_angle);
    if geometry.is_some() {
        ledger.from_source("measurement.geometry", SourceTag::Derived);
    } else {
        ledger.unresolved("measurement.geometry", "scattering angle missing from reduced header");
    }

    for (field, present) in [
        ("measurement.reduction_time", measurement.reduction_time.is_some()),
        ("measurement.reduction_version", measurement.reduction_version.is_some()),
    ] {
        if present {
            ledger.from_source(field, SourceTag::ReducedHeader);
        } else {
            ledger.unresolved(field, "missing from reduced header");
        }
    }

    for field in ["measurement.q", "measurement.r", "measurement.dr", "measurement.dq"] {
        ledger.from_source(field, SourceTag::ReducedData);
    }

    MeasurementBlock {
        geometry,
        reduction_time: measurement.reduction_time,
        reduction_version: measurement.reduction_version.clone(),
        q: measurement.q.clone(),
        r: measurement.r.clone(),
        dr: measurement.dr.clone(),
        dq: measurement.dq.clone(),
    }
}

fn dataset_warnings(
    ledger: &mut FieldLedger,
    measurement: &MeasurementSource,
    config: &AssemblyConfig,
) {
    let points = measurement.len();
    if points < config.min_points_warning {
        ledger.warn(format!(
            "reflectivity curve has only {points} points (fewer than {})",
            config.min_points_warning
        ));
    }
    if let Some((_, q_max)) = measurement.q_range() {
        if q_max < config.q_max_warning {
            ledger.warn(format!(
                "reflectivity curve Q range is very small: q_max {q_max} < {}",
                config.q_max_warning
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use refl_core::errors::CoreError;
    use refl_core::provenance::FieldState;
    use refl_core::sources::MetadataValue;

    use crate::instruments::InstrumentRegistry;

    fn measurement() -> MeasurementSource {
        let q: Vec<f64> = (1..=12).map(|i| f64::from(i) * 0.01).collect();
        let n = q.len();
        MeasurementSource {
            source_path: Some("/SNS/REF_L/IPTS-34347/shared/REF_L_218386.txt".into()),
            proposal_id: Some("IPTS-34347".into()),
            run_number: Some(218_386),
            run_title: Some("Cu/Ti on Si".into()),
            reduction_version: Some("quicknxs-4.1".into()),
            scattering_angle: Some(1.2),
            r: vec![0.5; n],
            dr: vec![0.01; n],
            dq: vec![0.001; n],
            q,
            ..MeasurementSource::default()
        }
    }

    fn ref_l() -> InstrumentProfile {
        InstrumentRegistry::builtin().resolve("REF_L").clone()
    }

    fn build_ref_l(
        source: &MeasurementSource,
        metadata: Option<&MetadataSource>,
    ) -> Result<BuildOutput<ReflectivityRecord>, BuildError> {
        build_reflectivity(source, metadata, &ref_l(), &AssemblyConfig::default())
    }

    #[test]
    fn measurement_arrays_are_copied_unchanged() {
        let source = measurement();
        let out = build_ref_l(&source, None).unwrap();
        let block = &out.record.measurement;
        assert_eq!(block.q, source.q);
        assert_eq!(block.r, source.r);
        assert_eq!(block.dr, source.dr);
        assert_eq!(block.dq, source.dq);
        assert_eq!(block.geometry, Some(Geometry::FrontReflection));
        assert_eq!(block.reduction_version.as_deref(), Some("quicknxs-4.1"));
    }

    #[test]
    fn header_only_fills_header_fields_and_profile_defaults() {
        let out = build_ref_l(&measurement(), None).unwrap();
        let record = &out.record;
        assert_eq!(record.proposal_number.as_deref(), Some("IPTS-34347"));
        assert_eq!(record.run_number.as_deref(), Some("218386"));
        assert_eq!(record.facility.as_deref(), Some("SNS"));
        assert_eq!(record.instrument_name.as_deref(), Some("REF_L"));
        assert!(matches!(
            out.provenance.get("facility"),
            Some(FieldState::Default {
                source: SourceTag::InstrumentProfile,
                ..
            })
        ));
        let flagged: Vec<String> = out.review_flags.iter().map(ToString::to_string).collect();
        let raw_file_flag = "reflectivity.raw_file_path: parquet metadata not provided".to_string();
        assert!(flagged.contains(&raw_file_flag));
    }

    #[test]
    fn generic_profile_leaves_facility_unresolved() {
        let out = build_reflectivity(
            &measurement(),
            None,
            &InstrumentProfile::generic(),
            &AssemblyConfig::default(),
        )
        .unwrap();
        assert_eq!(out.record.facility, None);
        let flag = out
            .review_flags
            .iter()
            .find(|f| f.field == "facility")
            .unwrap();
        assert_eq!(flag.to_string(), "reflectivity.facility: parquet metadata not provided");
    }

    #[test]
    fn metadata_wins_over_header() {
        let mut metadata = MetadataSource::default();
        metadata.insert("metadata", "run_number", MetadataValue::Float(218_390.0));
        metadata.insert(
            "metadata",
            "experiment_identifier",
            MetadataValue::String("IPTS-1".into()),
        );
        metadata.insert("metadata", "title", MetadataValue::String(String::new()));
        metadata.insert("instrument", "facility", MetadataValue::String("HFIR".into()));

        let out = build_ref_l(&measurement(), Some(&metadata)).unwrap();
        assert_eq!(out.record.run_number.as_deref(), Some("218390"));
        assert_eq!(out.record.proposal_number.as_deref(), Some("IPTS-1"));
        assert_eq!(out.record.facility.as_deref(), Some("HFIR"));
        // blank metadata title falls through to the header
        assert_eq!(out.record.run_title.as_deref(), Some("Cu/Ti on Si"));
        assert_eq!(
            out.provenance.get("run_title"),
            Some(&FieldState::FromSource {
                source: SourceTag::ReducedHeader
            })
        );
    }

    #[test]
    fn bad_metadata_timestamp_warns_and_falls_through() {
        let mut source = measurement();
        source.run_start = DateTime::from_timestamp(1_700_000_000, 0);
        let mut metadata = MetadataSource::default();
        metadata.insert("metadata", "start_time", MetadataValue::String("yesterday".into()));

        let out = build_ref_l(&source, Some(&metadata)).unwrap();
        assert_eq!(out.record.run_start, source.run_start);
        assert!(out.warnings.iter().any(|w| w.contains("start_time")));
    }

    #[test]
    fn small_datasets_warn() {
        let source = MeasurementSource {
            q: vec![0.001, 0.002],
            r: vec![1.0, 0.9],
            dr: vec![0.1, 0.1],
            dq: vec![0.0, 0.0],
            ..MeasurementSource::default()
        };
        let out = build_ref_l(&source, None).unwrap();
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.record.measurement.geometry, None);
    }

    #[test]
    fn unequal_arrays_fail() {
        let mut source = measurement();
        source.dq.pop();
        let err = build_ref_l(&source, None).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidMeasurement(CoreError::ColumnLengthMismatch { .. })
        ));
    }
}
