//! Assembly orchestration.
//!
//! [`Assembler::assemble`] runs the whole pipeline over already-parsed
//! sources: resolve the instrument profile, select the co-refinement dataset,
//! build the records, link them and merge their side data. It does no
//! I/O and never panics on bad input; the outcome is a tagged
//! [`AssemblyOutcome`].

use chrono::{DateTime, Utc};
use refl_config::{AssemblerConfig, AssemblyConfig};
use refl_core::enums::{AssemblyStatus, RecordKind, SourceTag};
use refl_core::provenance::{Provenance, ReviewFlag};
use refl_core::records::{EnvironmentRecord, ModelRecord, ReflectivityRecord, SampleRecord};
use refl_core::report::{AssemblyReport, ProvenanceReport, SelectionReport};
use refl_core::sources::{MeasurementSource, MetadataSource, ModelSource};

use crate::builders::{
    EnvironmentInputs, build_environment, build_model, build_reflectivity, build_sample,
};
use crate::error::{AssemblyError, BuildError};
use crate::instruments::InstrumentRegistry;
use crate::selector::select_dataset;
use crate::validation::validate_links;

/// Parsed sources for one assembly call. Only the measurement is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyInputs<'a> {
    pub measurement: Option<&'a MeasurementSource>,
    pub metadata: Option<&'a MetadataSource>,
    pub model: Option<&'a ModelSource>,
    /// Explicit co-refinement dataset index (0-based).
    pub dataset_index: Option<usize>,
    /// Replaces the derived environment description.
    pub environment_description: Option<&'a str>,
}

impl<'a> AssemblyInputs<'a> {
    #[must_use]
    pub fn new(measurement: &'a MeasurementSource) -> Self {
        Self {
            measurement: Some(measurement),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_metadata(mut self, metadata: &'a MetadataSource) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub const fn with_model(mut self, model: &'a ModelSource) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub const fn with_dataset_index(mut self, index: usize) -> Self {
        self.dataset_index = Some(index);
        self
    }

    #[must_use]
    pub const fn with_environment_description(mut self, description: &'a str) -> Self {
        self.environment_description = Some(description);
        self
    }
}

/// Records and side data from a successful or partially successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyResult {
    pub instrument: String,
    pub reflectivity: ReflectivityRecord,
    pub sample: Option<SampleRecord>,
    pub environment: Option<EnvironmentRecord>,
    /// Present when a model was supplied and its record could be built.
    pub model: Option<ModelRecord>,
    pub provenance: ProvenanceReport,
    pub selection: Option<SelectionReport>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub review_flags: Vec<ReviewFlag>,
    pub assembled_at: DateTime<Utc>,
}

impl AssemblyResult {
    #[must_use]
    pub fn needs_human_review(&self) -> bool {
        !self.review_flags.is_empty()
    }

    #[must_use]
    pub fn status(&self) -> AssemblyStatus {
        if self.errors.is_empty() {
            AssemblyStatus::Success
        } else {
            AssemblyStatus::PartialSuccess
        }
    }

    #[must_use]
    pub fn report(&self) -> AssemblyReport {
        AssemblyReport {
            status: self.status(),
            instrument: Some(self.instrument.clone()),
            reflectivity_id: Some(self.reflectivity.id.clone()),
            sample_id: self.sample.as_ref().map(|s| s.id.clone()),
            environment_id: self.environment.as_ref().map(|e| e.id.clone()),
            model_id: self.model.as_ref().map(|m| m.id.clone()),
            selection: self.selection.clone(),
            warnings: self.warnings.clone(),
            errors: self.errors.clone(),
            review_flags: self.review_flags.clone(),
            needs_human_review: self.needs_human_review(),
            provenance: self.provenance.clone(),
            assembled_at: self.assembled_at,
        }
    }

    /// One-line description for terminal output.
    #[must_use]
    pub fn summary(&self) -> String {
        let records = 1
            + usize::from(self.sample.is_some())
            + usize::from(self.environment.is_some())
            + usize::from(self.model.is_some());
        format!(
            "{}: {records} record(s) for {}, {} warning(s), {} error(s), {} review flag(s)",
            self.status(),
            self.instrument,
            self.warnings.len(),
            self.errors.len(),
            self.review_flags.len()
        )
    }
}

/// A fatal run: no records.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyFailure {
    pub error: AssemblyError,
    pub instrument: Option<String>,
    pub warnings: Vec<String>,
    pub assembled_at: DateTime<Utc>,
}

impl AssemblyFailure {
    fn new(error: AssemblyError, instrument: Option<String>, warnings: Vec<String>) -> Self {
        tracing::warn!(%error, "assembly failed");
        Self {
            error,
            instrument,
            warnings,
            assembled_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn report(&self) -> AssemblyReport {
        AssemblyReport {
            status: AssemblyStatus::Failure,
            instrument: self.instrument.clone(),
            reflectivity_id: None,
            sample_id: None,
            environment_id: None,
            model_id: None,
            selection: None,
            warnings: self.warnings.clone(),
            errors: vec![self.error.to_string()],
            review_flags: Vec::new(),
            needs_human_review: false,
            provenance: ProvenanceReport::default(),
            assembled_at: self.assembled_at,
        }
    }
}

/// Outcome of one assembly call.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyOutcome {
    Success(AssemblyResult),
    /// An optional record could not be built; see `errors`.
    PartialSuccess(AssemblyResult),
    Failure(AssemblyFailure),
}

impl AssemblyOutcome {
    #[must_use]
    pub const fn status(&self) -> AssemblyStatus {
        match self {
            Self::Success(_) => AssemblyStatus::Success,
            Self::PartialSuccess(_) => AssemblyStatus::PartialSuccess,
            Self::Failure(_) => AssemblyStatus::Failure,
        }
    }

    #[must_use]
    pub const fn result(&self) -> Option<&AssemblyResult> {
        match self {
            Self::Success(result) | Self::PartialSuccess(result) => Some(result),
            Self::Failure(_) => None,
        }
    }

    /// # Errors
    ///
    /// Returns the failure when no records were produced.
    pub fn into_result(self) -> Result<AssemblyResult, AssemblyFailure> {
        match self {
            Self::Success(result) | Self::PartialSuccess(result) => Ok(result),
            Self::Failure(failure) => Err(failure),
        }
    }

    #[must_use]
    pub fn report(&self) -> AssemblyReport {
        match self {
            Self::Success(result) | Self::PartialSuccess(result) => result.report(),
            Self::Failure(failure) => failure.report(),
        }
    }
}

/// Stateless assembler holding the instrument registry and thresholds.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    registry: InstrumentRegistry,
    config: AssemblyConfig,
}

impl Assembler {
    #[must_use]
    pub const fn new(registry: InstrumentRegistry, config: AssemblyConfig) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn from_config(config: &AssemblerConfig) -> Self {
        Self::new(InstrumentRegistry::from_config(config), config.assembly.clone())
    }

    #[must_use]
    pub const fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// Assemble the records for one measurement.
    #[must_use]
    pub fn assemble(&self, inputs: &AssemblyInputs<'_>) -> AssemblyOutcome {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        let mut review_flags = Vec::new();

        let Some(measurement) = inputs.measurement else {
            return AssemblyOutcome::Failure(AssemblyFailure::new(
                AssemblyError::MissingMeasurement,
                None,
                warnings,
            ));
        };
        if let Err(e) = measurement.validate() {
            return AssemblyOutcome::Failure(AssemblyFailure::new(
                AssemblyError::Measurement(BuildError::InvalidMeasurement(e)),
                None,
                warnings,
            ));
        }

        let metadata = inputs.metadata;
        let identifiers = [
            metadata.and_then(|m| m.text("metadata", "instrument_id")),
            metadata.and_then(|m| m.text("instrument", "name")),
            measurement.source_path.clone(),
        ];
        let profile = self
            .registry
            .resolve_first(identifiers.iter().flatten().map(String::as_str));
        tracing::debug!(profile = %profile.name, "resolved instrument profile");
        if profile.is_generic() {
            warnings.push("instrument not recognised; using the generic profile".to_string());
        }
        let instrument = profile.name.clone();

        let selection = match inputs.model {
            Some(model) => match select_dataset(model, measurement, inputs.dataset_index) {
                Ok(selection) => Some(selection),
                Err(e) => {
                    return AssemblyOutcome::Failure(AssemblyFailure::new(
                        e.into(),
                        Some(instrument),
                        warnings,
                    ));
                }
            },
            None => {
                if let Some(index) = inputs.dataset_index {
                    warnings.push(format!("dataset index {index} ignored: no model provided"));
                }
                None
            }
        };
        if let Some(selection) = &selection {
            warnings.extend(selection.warnings.iter().cloned());
            review_flags.extend(selection.review_flags.iter().cloned());
        }

        let reflectivity = match build_reflectivity(measurement, metadata, profile, &self.config) {
            Ok(output) => output,
            Err(e) => {
                return AssemblyOutcome::Failure(AssemblyFailure::new(
                    AssemblyError::Measurement(e),
                    Some(instrument),
                    warnings,
                ));
            }
        };

        let model_selection = inputs.model.zip(selection.as_ref());
        let sample = match build_sample(model_selection, measurement, metadata) {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::warn!(error = %e, "sample record omitted");
                errors.push(format!("sample: {e}"));
                None
            }
        };

        let experiment =
            model_selection.and_then(|(model, selection)| model.experiment(selection.index));
        let environment = match build_environment(&EnvironmentInputs {
            metadata,
            profile,
            experiment,
            description: inputs.environment_description,
        }) {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::warn!(error = %e, "environment record omitted");
                errors.push(format!("environment: {e}"));
                None
            }
        };

        let model = match model_selection {
            Some((source, selection)) => match build_model(source, selection) {
                Ok(output) => Some(output),
                Err(e) => {
                    tracing::warn!(error = %e, "model record omitted");
                    errors.push(format!("model: {e}"));
                    None
                }
            },
            None => None,
        };

        let (mut reflectivity_record, mut reflectivity_prov) =
            (reflectivity.record, reflectivity.provenance);
        warnings.extend(reflectivity.warnings);
        review_flags.extend(reflectivity.review_flags);

        let mut sample_parts = sample.map(|out| {
            warnings.extend(out.warnings);
            review_flags.extend(out.review_flags);
            (out.record, out.provenance)
        });
        let mut environment_parts = environment.map(|out| {
            warnings.extend(out.warnings);
            review_flags.extend(out.review_flags);
            (out.record, out.provenance)
        });
        let mut model_parts = model.map(|out| {
            warnings.extend(out.warnings);
            review_flags.extend(out.review_flags);
            (out.record, out.provenance)
        });

        let sample_id = sample_parts.as_ref().map(|(r, _)| r.id.clone());
        let environment_id = environment_parts.as_ref().map(|(r, _)| r.id.clone());
        let mut links = Linker {
            flags: &mut review_flags,
        };

        reflectivity_record.sample_id = links.link(
            &mut reflectivity_prov,
            RecordKind::Reflectivity,
            "sample_id",
            sample_id.as_deref(),
            RecordKind::Sample,
        );
        reflectivity_record.environment_id = links.link(
            &mut reflectivity_prov,
            RecordKind::Reflectivity,
            "environment_id",
            environment_id.as_deref(),
            RecordKind::Environment,
        );
        if let Some((record, prov)) = &mut sample_parts {
            record.environment_ids = links
                .link(
                    prov,
                    RecordKind::Sample,
                    "environment_ids",
                    environment_id.as_deref(),
                    RecordKind::Environment,
                )
                .into_iter()
                .collect();
        }
        if let Some((record, prov)) = &mut environment_parts {
            record.sample_id = links.link(
                prov,
                RecordKind::Environment,
                "sample_id",
                sample_id.as_deref(),
                RecordKind::Sample,
            );
            record.measurement_ids = vec![reflectivity_record.id.clone()];
            prov.from_source("measurement_ids", SourceTag::Derived);
        }
        if let Some((record, prov)) = &mut model_parts {
            record.measurement_ids = vec![reflectivity_record.id.clone()];
            prov.from_source("measurement_ids", SourceTag::Derived);
        }

        let (sample, sample_prov) = sample_parts.unzip();
        let (environment, environment_prov) = environment_parts.unzip();
        let (model, model_prov) = model_parts.unzip();
        let mut result = AssemblyResult {
            instrument,
            reflectivity: reflectivity_record,
            sample,
            environment,
            model,
            provenance: ProvenanceReport {
                reflectivity: Some(reflectivity_prov),
                sample: sample_prov,
                environment: environment_prov,
                model: model_prov,
            },
            selection: selection.map(|s| s.report()),
            warnings,
            errors,
            review_flags,
            assembled_at: Utc::now(),
        };

        for violation in validate_links(&result) {
            tracing::error!(%violation, "cross-reference check failed");
            result.errors.push(violation);
        }

        tracing::debug!(
            status = %result.status(),
            warnings = result.warnings.len(),
            review_flags = result.review_flags.len(),
            "assembly finished"
        );
        if result.errors.is_empty() {
            AssemblyOutcome::Success(result)
        } else {
            AssemblyOutcome::PartialSuccess(result)
        }
    }
}

/// Sets foreign keys and their provenance.
struct Linker<'a> {
    flags: &'a mut Vec<ReviewFlag>,
}

impl Linker<'_> {
    fn link(
        &mut self,
        provenance: &mut Provenance,
        kind: RecordKind,
        field: &str,
        target: Option<&str>,
        target_kind: RecordKind,
    ) -> Option<String> {
        if let Some(id) = target {
            provenance.from_source(field, SourceTag::Derived);
            return Some(id.to_string());
        }
        let reason = format!("{target_kind} record was not produced");
        provenance.unresolved(field, reason.clone());
        self.flags.push(ReviewFlag::new(kind, field, reason));
        None
    }
}
