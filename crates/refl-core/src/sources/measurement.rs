use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// One row of the reduction run table found in the reduced-file header.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ReductionRun {
    pub data_run: u64,
    pub norm_run: u64,
    pub two_theta: f64,
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub q_min: f64,
    pub q_max: f64,
}

/// Contents of a reduced-data text file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MeasurementSource {
    pub source_path: Option<String>,
    pub proposal_id: Option<String>,
    pub run_number: Option<u64>,
    pub run_title: Option<String>,
    pub run_start: Option<DateTime<Utc>>,
    pub reduction_time: Option<DateTime<Utc>>,
    pub reduction_version: Option<String>,
    pub scattering_angle: Option<f64>,
    #[serde(default)]
    pub runs: Vec<ReductionRun>,
    pub q: Vec<f64>,
    pub r: Vec<f64>,
    pub dr: Vec<f64>,
    pub dq: Vec<f64>,
}

impl MeasurementSource {
    /// Number of data points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.q.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Check the column invariant: four arrays of equal length N >= 1.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyMeasurement`] or
    /// [`CoreError::ColumnLengthMismatch`].
    pub fn validate(&self) -> Result<(), CoreError> {
        let n = self.q.len();
        if self.r.len() != n || self.dr.len() != n || self.dq.len() != n {
            return Err(CoreError::ColumnLengthMismatch {
                q: n,
                r: self.r.len(),
                dr: self.dr.len(),
                dq: self.dq.len(),
            });
        }
        if n == 0 {
            return Err(CoreError::EmptyMeasurement);
        }
        Ok(())
    }

    /// Smallest and largest finite Q value.
    #[must_use]
    pub fn q_range(&self) -> Option<(f64, f64)> {
        self.q
            .iter()
            .copied()
            .filter(|q| q.is_finite())
            .fold(None, |acc, q| match acc {
                None => Some((q, q)),
                Some((lo, hi)) => Some((lo.min(q), hi.max(q))),
            })
    }
}
