//! Timestamp encodings for the lakehouse row structs.
//!
//! Records carry `DateTime<Utc>` and serialize to RFC 3339 in JSON. Rows
//! bound for Arrow need plain `i64` microseconds so that `serde_arrow` traces
//! an integer column, which the writer then retypes to
//! `Timestamp(Microsecond, Some("UTC"))`:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct EnvironmentRow {
//!     #[serde(with = "arrow_serde::timestamp_micros_utc")]
//!     assembled_at: DateTime<Utc>,
//!     #[serde(with = "arrow_serde::timestamp_micros_utc_option")]
//!     run_start: Option<DateTime<Utc>>,
//! }
//! ```

use chrono::{DateTime, Utc};

fn from_micros<E: serde::de::Error>(micros: i64) -> Result<DateTime<Utc>, E> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| E::custom(format!("timestamp out of range: {micros} microseconds")))
}

pub mod timestamp_micros_utc {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(dt.timestamp_micros())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        super::from_micros(i64::deserialize(d)?)
    }
}

/// Nullable variant; `None` stays a null cell.
pub mod timestamp_micros_utc_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_some(&dt.timestamp_micros()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<i64>::deserialize(d)?.map(super::from_micros).transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        #[serde(with = "super::timestamp_micros_utc")]
        assembled_at: DateTime<Utc>,
        #[serde(with = "super::timestamp_micros_utc_option")]
        run_start: Option<DateTime<Utc>>,
    }

    #[test]
    fn encodes_microseconds() {
        let row = Row {
            assembled_at: DateTime::from_timestamp_micros(1_745_172_273_409_007).unwrap(),
            run_start: None,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"assembled_at":1745172273409007,"run_start":null}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }

    #[test]
    fn present_run_start_keeps_sub_second_precision() {
        let row = Row {
            assembled_at: DateTime::UNIX_EPOCH,
            run_start: DateTime::from_timestamp_micros(1_000_001),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"assembled_at":0,"run_start":1000001}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }

    #[test]
    fn out_of_range_micros_are_rejected() {
        let json = format!(r#"{{"assembled_at":{},"run_start":null}}"#, i64::MAX);
        let err = serde_json::from_str::<Row>(&json).unwrap_err();
        assert!(err.to_string().contains("timestamp out of range"));
    }
}
