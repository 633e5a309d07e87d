//! Enumerations shared by the records, provenance and report types.
//!
//! All enums serialize as `snake_case` except [`Geometry`], which keeps the
//! free-text form stored in the lakehouse (`"front reflection"`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Measurement geometry derived from the sign of the scattering angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Geometry {
    #[serde(rename = "front reflection")]
    FrontReflection,
    #[serde(rename = "back reflection")]
    BackReflection,
}

impl Geometry {
    /// Non-negative angles reflect off the front surface, negative angles
    /// come through the substrate. Non-finite angles yield `None`.
    #[must_use]
    pub fn from_scattering_angle(angle: f64) -> Option<Self> {
        if !angle.is_finite() {
            return None;
        }
        if angle >= 0.0 {
            Some(Self::FrontReflection)
        } else {
            Some(Self::BackReflection)
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FrontReflection => "front reflection",
            Self::BackReflection => "back reflection",
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EnvironmentQuantity
// ---------------------------------------------------------------------------

/// Environmental condition resolved from DAS log channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentQuantity {
    Temperature,
    Pressure,
    Humidity,
}

impl EnvironmentQuantity {
    pub const ALL: [Self; 3] = [Self::Temperature, Self::Pressure, Self::Humidity];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Humidity => "humidity",
        }
    }

    /// Name of the Environment record field holding this quantity.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Humidity => "relative_humidity",
        }
    }

    /// Unit suffix used in derived environment descriptions.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "K",
            Self::Pressure => "Pa",
            Self::Humidity => "%",
        }
    }

    /// Short symbol used in derived environment descriptions.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Temperature => "T",
            Self::Pressure => "P",
            Self::Humidity => "RH",
        }
    }
}

impl fmt::Display for EnvironmentQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RecordKind
// ---------------------------------------------------------------------------

/// The assembled record types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Reflectivity,
    Sample,
    Environment,
    Model,
}

impl RecordKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reflectivity => "reflectivity",
            Self::Sample => "sample",
            Self::Environment => "environment",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SourceTag
// ---------------------------------------------------------------------------

/// Where a field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// `#` header of the reduced-data file.
    ReducedHeader,
    /// Data columns of the reduced-data file.
    ReducedData,
    /// Parquet metadata tables or DAS logs.
    Metadata,
    /// Fitted-model JSON.
    Model,
    /// Fixed defaults of the resolved instrument profile.
    InstrumentProfile,
    /// Value supplied by the caller (explicit index, description override).
    Caller,
    /// Computed from other resolved fields.
    Derived,
    /// Built-in fallback constant.
    Builtin,
}

impl SourceTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReducedHeader => "reduced_header",
            Self::ReducedData => "reduced_data",
            Self::Metadata => "metadata",
            Self::Model => "model",
            Self::InstrumentProfile => "instrument_profile",
            Self::Caller => "caller",
            Self::Derived => "derived",
            Self::Builtin => "builtin",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SelectionMode
// ---------------------------------------------------------------------------

/// How the co-refinement dataset index was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// The model holds one experiment.
    SingleExperiment,
    /// Caller supplied the index.
    Explicit,
    /// Best interpolation score.
    AutoDetected,
    /// No usable probe overlap; index 0 was taken.
    Fallback,
}

impl SelectionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleExperiment => "single_experiment",
            Self::Explicit => "explicit",
            Self::AutoDetected => "auto_detected",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AssemblyStatus
// ---------------------------------------------------------------------------

/// Outcome class of one assembly call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStatus {
    Success,
    PartialSuccess,
    Failure,
}

impl AssemblyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for AssemblyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, Some(Geometry::FrontReflection))]
    #[case(0.6, Some(Geometry::FrontReflection))]
    #[case(-0.6, Some(Geometry::BackReflection))]
    #[case(f64::NAN, None)]
    #[case(f64::INFINITY, None)]
    fn geometry_follows_angle_sign(#[case] angle: f64, #[case] expected: Option<Geometry>) {
        assert_eq!(Geometry::from_scattering_angle(angle), expected);
    }

    #[test]
    fn geometry_serializes_as_free_text() {
        let json = serde_json::to_string(&Geometry::BackReflection).unwrap();
        assert_eq!(json, "\"back reflection\"");
        let back: Geometry = serde_json::from_str("\"front reflection\"").unwrap();
        assert_eq!(back, Geometry::FrontReflection);
    }

    #[test]
    fn humidity_maps_to_relative_humidity_field() {
        assert_eq!(EnvironmentQuantity::Humidity.field_name(), "relative_humidity");
        assert_eq!(EnvironmentQuantity::Humidity.to_string(), "humidity");
    }

    #[test]
    fn snake_case_serialization() {
        assert_eq!(
            serde_json::to_string(&SelectionMode::AutoDetected).unwrap(),
            "\"auto_detected\""
        );
        assert_eq!(
            serde_json::to_string(&AssemblyStatus::PartialSuccess).unwrap(),
            "\"partial_success\""
        );
        assert_eq!(
            serde_json::to_string(&SourceTag::InstrumentProfile).unwrap(),
            "\"instrument_profile\""
        );
    }
}
