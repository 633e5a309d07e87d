use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::EnvironmentQuantity;

/// Conditions the sample was measured under.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EnvironmentRecord {
    pub id: String,
    pub sample_id: Option<String>,
    pub description: Option<String>,
    pub ambient_medium: Option<String>,
    /// Kelvin.
    pub temperature: Option<f64>,
    /// Pascal.
    pub pressure: Option<f64>,
    /// Percent.
    pub relative_humidity: Option<f64>,
    pub measurement_ids: Vec<String>,
}

impl EnvironmentRecord {
    #[must_use]
    pub const fn quantity(&self, quantity: EnvironmentQuantity) -> Option<f64> {
        match quantity {
            EnvironmentQuantity::Temperature => self.temperature,
            EnvironmentQuantity::Pressure => self.pressure,
            EnvironmentQuantity::Humidity => self.relative_humidity,
        }
    }

    pub const fn set_quantity(&mut self, quantity: EnvironmentQuantity, value: Option<f64>) {
        match quantity {
            EnvironmentQuantity::Temperature => self.temperature = value,
            EnvironmentQuantity::Pressure => self.pressure = value,
            EnvironmentQuantity::Humidity => self.relative_humidity = value,
        }
    }
}
