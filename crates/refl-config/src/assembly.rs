//! Assembly thresholds.

use serde::{Deserialize, Serialize};

const fn default_min_points_warning() -> usize {
    10
}

const fn default_q_max_warning() -> f64 {
    0.01
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AssemblyConfig {
    /// Warn when a measurement has fewer points than this.
    #[serde(default = "default_min_points_warning")]
    pub min_points_warning: usize,

    /// Warn when the largest Q (1/Å) is below this.
    #[serde(default = "default_q_max_warning")]
    pub q_max_warning: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            min_points_warning: default_min_points_warning(),
            q_max_warning: default_q_max_warning(),
        }
    }
}
