//! Record builders.
//!
//! Each builder is a pure function from the available sources to one record
//! plus its provenance, warnings and review flags. Field precedence is
//! metadata table (present and non-empty) over reduced header; anything left
//! is unresolved and flagged for review.

mod environment;
mod model;
mod reflectivity;
mod sample;

pub use environment::{EnvironmentInputs, STANDARD_CONDITIONS, build_environment};
pub use model::build_model;
pub use reflectivity::build_reflectivity;
pub use sample::build_sample;

use refl_core::enums::{RecordKind, SelectionMode, SourceTag};
use refl_core::provenance::{Provenance, ReviewFlag};
use refl_core::sources::{Experiment, MeasurementSource, MetadataSource};

use crate::error::BuildError;
use crate::selector::Selection;

/// Reason given for metadata-derived fields when no metadata was supplied.
pub(crate) const METADATA_NOT_PROVIDED: &str = "parquet metadata not provided";

/// Reason given for model-derived fields when no model was supplied.
pub(crate) const MODEL_NOT_PROVIDED: &str = "model not provided";

/// A built record with its side data.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput<R> {
    pub record: R,
    pub provenance: Provenance,
    pub warnings: Vec<String>,
    pub review_flags: Vec<ReviewFlag>,
}

/// Collects provenance, warnings and review flags while a record is built.
#[derive(Debug)]
pub(crate) struct FieldLedger {
    kind: RecordKind,
    provenance: Provenance,
    warnings: Vec<String>,
    review_flags: Vec<ReviewFlag>,
}

impl FieldLedger {
    pub(crate) fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            provenance: Provenance::new(),
            warnings: Vec::new(),
            review_flags: Vec::new(),
        }
    }

    pub(crate) fn from_source(&mut self, field: &str, source: SourceTag) {
        self.provenance.from_source(field, source);
    }

    pub(crate) fn defaulted(&mut self, field: &str, source: SourceTag, note: impl Into<String>) {
        self.provenance.defaulted(field, source, note);
    }

    /// Mark a field unresolved and raise a review flag for it.
    pub(crate) fn unresolved(&mut self, field: &str, reason: impl Into<String>) {
        let reason = reason.into();
        self.provenance.unresolved(field, reason.clone());
        self.flag(field, reason);
    }

    /// Mark a field unresolved without raising a review flag. For values
    /// whose absence needs no follow-up, such as fields of an input that
    /// was not supplied.
    pub(crate) fn absent(&mut self, field: &str, reason: impl Into<String>) {
        self.provenance.unresolved(field, reason);
    }

    /// Raise a review flag without touching provenance.
    pub(crate) fn flag(&mut self, field: &str, reason: impl Into<String>) {
        self.review_flags.push(ReviewFlag::new(self.kind, field, reason));
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(record = %self.kind, "{message}");
        self.warnings.push(message);
    }

    /// Take the first present candidate, recording where it came from.
    /// With no candidate the field is unresolved with `reason`.
    pub(crate) fn pick<T>(
        &mut self,
        field: &str,
        candidates: impl IntoIterator<Item = (Option<T>, SourceTag)>,
        reason: impl FnOnce() -> String,
    ) -> Option<T> {
        for (value, source) in candidates {
            if let Some(value) = value {
                self.from_source(field, source);
                return Some(value);
            }
        }
        self.unresolved(field, reason());
        None
    }

    pub(crate) fn finish<R>(self, record: R) -> BuildOutput<R> {
        BuildOutput {
            record,
            provenance: self.provenance,
            warnings: self.warnings,
            review_flags: self.review_flags,
        }
    }
}

/// Why a metadata-or-header field could not be resolved.
pub(crate) fn missing_reason(metadata: Option<&MetadataSource>, what: &str) -> String {
    if metadata.is_some() {
        format!("{what} not found in parquet metadata or reduced header")
    } else {
        format!("{METADATA_NOT_PROVIDED}; {what} missing from reduced header")
    }
}

/// The selected index, with provenance following the selection mode.
pub(crate) fn dataset_index(ledger: &mut FieldLedger, selection: &Selection) -> Option<u32> {
    match selection.mode {
        SelectionMode::Explicit => ledger.from_source("dataset_index", SourceTag::Caller),
        SelectionMode::SingleExperiment | SelectionMode::AutoDetected => {
            ledger.from_source("dataset_index", SourceTag::Derived);
        }
        SelectionMode::Fallback => ledger.defaulted(
            "dataset_index",
            SourceTag::Builtin,
            "auto-detection failed; first experiment used",
        ),
    }
    u32::try_from(selection.index).ok()
}

/// Reject a stack with NaN or infinite layer values.
pub(crate) fn check_layers(experiment: &Experiment) -> Result<(), BuildError> {
    match experiment.layers.iter().position(|layer| !layer.is_finite()) {
        Some(index) => Err(BuildError::NonFiniteLayer {
            index,
            name: experiment.layers[index].name.clone(),
        }),
        None => Ok(()),
    }
}

/// Run title: metadata `title` over the reduced header.
pub(crate) fn run_title(
    measurement: &MeasurementSource,
    metadata: Option<&MetadataSource>,
) -> Option<(String, SourceTag)> {
    metadata
        .and_then(|m| m.text("metadata", "title"))
        .map(|t| (t, SourceTag::Metadata))
        .or_else(|| {
            measurement
                .run_title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| (t.to_string(), SourceTag::ReducedHeader))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use refl_core::provenance::FieldState;
    use refl_core::sources::MetadataValue;

    #[test]
    fn pick_takes_first_present_candidate() {
        let mut ledger = FieldLedger::new(RecordKind::Reflectivity);
        let value = ledger.pick(
            "run_number",
            [(None, SourceTag::Metadata), (Some("7"), SourceTag::ReducedHeader)],
            || "missing".to_string(),
        );
        assert_eq!(value, Some("7"));
        let out = ledger.finish(());
        assert_eq!(
            out.provenance.get("run_number"),
            Some(&FieldState::FromSource {
                source: SourceTag::ReducedHeader
            })
        );
        assert!(out.review_flags.is_empty());
    }

    #[test]
    fn pick_flags_unresolved_field() {
        let mut ledger = FieldLedger::new(RecordKind::Reflectivity);
        let value: Option<String> = ledger.pick("facility", [(None, SourceTag::Metadata)], || {
            format!("facility: {METADATA_NOT_PROVIDED}")
        });
        assert!(value.is_none());
        let out = ledger.finish(());
        assert_eq!(out.review_flags.len(), 1);
        assert_eq!(out.review_flags[0].qualified_field(), "reflectivity.facility");
    }

    #[test]
    fn run_title_prefers_metadata() {
        let measurement = MeasurementSource {
            run_title: Some("header title".into()),
            ..MeasurementSource::default()
        };
        let mut metadata = MetadataSource::default();
        assert_eq!(
            run_title(&measurement, Some(&metadata)),
            Some(("header title".to_string(), SourceTag::ReducedHeader))
        );
        metadata.insert("metadata", "title", MetadataValue::String("meta title".into()));
        assert_eq!(
            run_title(&measurement, Some(&metadata)),
            Some(("meta title".to_string(), SourceTag::Metadata))
        );
    }
}
