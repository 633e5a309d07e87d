use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A typed scalar from a metadata table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Null and blank strings count as "not present".
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.trim().is_empty(),
            Self::Float(f) => !f.is_nan(),
            Self::Bool(_) | Self::Integer(_) => true,
        }
    }

    /// Text form of a present value. Integral floats drop the fraction so a
    /// run number stored as `218386.0` reads as `218386`.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        if !self.is_present() {
            return None;
        }
        match self {
            Self::String(s) => Some(s.trim().to_string()),
            Self::Integer(i) => Some(i.to_string()),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null => None,
        }
    }

    /// Numeric form of a present value; numeric strings are parsed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Timestamp form of a present value.
    ///
    /// Strings accept RFC 3339 and `YYYY-MM-DD HH:MM:SS[.f]` (UTC assumed);
    /// integers are read as microseconds since the epoch.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::String(s) => parse_timestamp(s.trim()),
            Self::Integer(micros) => DateTime::<Utc>::from_timestamp_micros(*micros),
            _ => None,
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Summary statistics of one DAS log channel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LogChannel {
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl LogChannel {
    #[must_use]
    pub const fn new(average: Option<f64>, min: Option<f64>, max: Option<f64>) -> Self {
        Self { average, min, max }
    }

    /// The channel average, if it is a finite number.
    #[must_use]
    pub fn usable_average(&self) -> Option<f64> {
        self.average.filter(|v| v.is_finite())
    }
}

/// Contents of a Parquet metadata directory.
///
/// Absent tables are empty mappings; lookups never fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MetadataSource {
    pub directory: Option<String>,
    #[serde(default)]
    pub tables: BTreeMap<String, BTreeMap<String, MetadataValue>>,
    #[serde(default)]
    pub logs: BTreeMap<String, LogChannel>,
}

impl MetadataSource {
    /// Insert a field value, creating the table on first use.
    pub fn insert(&mut self, table: &str, field: &str, value: MetadataValue) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// A present (non-null, non-blank) value.
    #[must_use]
    pub fn value(&self, table: &str, field: &str) -> Option<&MetadataValue> {
        self.tables
            .get(table)
            .and_then(|t| t.get(field))
            .filter(|v| v.is_present())
    }

    #[must_use]
    pub fn text(&self, table: &str, field: &str) -> Option<String> {
        self.value(table, field).and_then(MetadataValue::as_text)
    }

    #[must_use]
    pub fn log(&self, channel: &str) -> Option<&LogChannel> {
        self.logs.get(channel)
    }

    /// True when neither tables nor log channels carry anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty) && self.logs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MetadataValue::Null, false)]
    #[case(MetadataValue::String(String::new()), false)]
    #[case(MetadataValue::String("   ".into()), false)]
    #[case(MetadataValue::String("IPTS-1234".into()), true)]
    #[case(MetadataValue::Integer(0), true)]
    #[case(MetadataValue::Bool(false), true)]
    #[case(MetadataValue::Float(f64::NAN), false)]
    fn presence_rules(#[case] value: MetadataValue, #[case] present: bool) {
        assert_eq!(value.is_present(), present);
    }

    #[test]
    fn integral_float_reads_as_integer_text() {
        assert_eq!(MetadataValue::Float(218_386.0).as_text().as_deref(), Some("218386"));
        assert_eq!(MetadataValue::Float(1.5).as_text().as_deref(), Some("1.5"));
    }

    #[test]
    fn blank_field_is_absent() {
        let mut meta = MetadataSource::default();
        meta.insert("metadata", "title", MetadataValue::String(" ".into()));
        meta.insert("metadata", "run_number", MetadataValue::Integer(7));
        assert!(meta.value("metadata", "title").is_none());
        assert_eq!(meta.text("metadata", "run_number").as_deref(), Some("7"));
        assert!(meta.text("sample", "name").is_none());
    }

    #[test]
    fn timestamps_parse_in_common_forms() {
        let rfc = MetadataValue::String("2025-04-20T14:30:00Z".into());
        let plain = MetadataValue::String("2025-04-20 14:30:00.250".into());
        assert!(rfc.as_timestamp().is_some());
        assert!(plain.as_timestamp().is_some());
        assert!(MetadataValue::String("yesterday".into()).as_timestamp().is_none());
    }

    #[test]
    fn untagged_deserialization() {
        let values: Vec<MetadataValue> =
            serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                MetadataValue::Null,
                MetadataValue::Bool(true),
                MetadataValue::Integer(3),
                MetadataValue::Float(2.5),
                MetadataValue::String("x".into()),
            ]
        );
    }
}
