//! Per-field provenance and review flags.
//!
//! Every record field lands in exactly one [`FieldState`]. Unresolved fields
//! also produce a [`ReviewFlag`]; the assembler merges flags from all builders
//! and sets `needs_human_review` when any remain.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{RecordKind, SourceTag};

/// Resolution state of one record field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FieldState {
    /// Value read from an input source.
    FromSource { source: SourceTag },
    /// Value filled from a profile default or built-in constant.
    Default { source: SourceTag, note: String },
    /// No source provided a value.
    Unresolved { reason: String },
}

impl FieldState {
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }
}

/// Field name to resolution state for a single record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct Provenance {
    fields: BTreeMap<String, FieldState>,
}

impl Provenance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field state. A later call for the same field replaces the
    /// earlier one, so each field keeps exactly one state.
    pub fn record(&mut self, field: impl Into<String>, state: FieldState) {
        self.fields.insert(field.into(), state);
    }

    pub fn from_source(&mut self, field: impl Into<String>, source: SourceTag) {
        self.record(field, FieldState::FromSource { source });
    }

    pub fn defaulted(
        &mut self,
        field: impl Into<String>,
        source: SourceTag,
        note: impl Into<String>,
    ) {
        self.record(
            field,
            FieldState::Default {
                source,
                note: note.into(),
            },
        );
    }

    pub fn unresolved(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.record(
            field,
            FieldState::Unresolved {
                reason: reason.into(),
            },
        );
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldState> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldState)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of unresolved fields, sorted.
    #[must_use]
    pub fn unresolved_fields(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, state)| state.is_unresolved())
            .map(|(name, _)| name)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A field that needs a human to confirm or fill it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReviewFlag {
    pub record: RecordKind,
    pub field: String,
    pub reason: String,
}

impl ReviewFlag {
    #[must_use]
    pub fn new(record: RecordKind, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// `record.field`, e.g. `environment.temperature`.
    #[must_use]
    pub fn qualified_field(&self) -> String {
        format!("{}.{}", self.record, self.field)
    }
}

impl std::fmt::Display for ReviewFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.qualified_field(), self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn each_field_keeps_one_state() {
        let mut prov = Provenance::new();
        prov.unresolved("facility", "parquet metadata not provided");
        prov.defaulted("facility", SourceTag::InstrumentProfile, "REF_L profile");
        assert_eq!(prov.len(), 1);
        assert!(prov.unresolved_fields().is_empty());
    }

    #[test]
    fn unresolved_fields_sorted() {
        let mut prov = Provenance::new();
        prov.unresolved("temperature", "no channel");
        prov.from_source("ambient_medium", SourceTag::Model);
        prov.unresolved("pressure", "no channel");
        assert_eq!(prov.unresolved_fields(), vec!["pressure", "temperature"]);
    }

    #[test]
    fn state_serializes_with_tag() {
        let state = FieldState::FromSource {
            source: SourceTag::Metadata,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, serde_json::json!({"state": "from_source", "source": "metadata"}));
    }

    #[test]
    fn review_flag_display() {
        let flag = ReviewFlag::new(RecordKind::Environment, "pressure", "no pressure log channel");
        assert_eq!(flag.to_string(), "environment.pressure: no pressure log channel");
    }
}
