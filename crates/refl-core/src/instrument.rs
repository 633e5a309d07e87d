//! Instrument profile data.
//!
//! A profile carries the fixed defaults of a beamline and the ordered DAS log
//! channel names for each environmental quantity. Profiles are plain data so
//! they can be loaded from configuration; lookup lives in
//! `refl_assembler::instruments`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::EnvironmentQuantity;

/// Name of the profile returned when nothing matches.
pub const GENERIC_PROFILE_NAME: &str = "generic";

/// Ordered log channel names per environmental quantity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct LogChannelAliases {
    pub temperature: Vec<String>,
    pub pressure: Vec<String>,
    pub humidity: Vec<String>,
}

impl LogChannelAliases {
    /// Channel names shared by instruments without a dedicated profile.
    #[must_use]
    pub fn generic() -> Self {
        Self {
            temperature: strings(&["SampleTemp", "Temperature", "Temp", "sample_temperature"]),
            pressure: strings(&["Pressure", "VacuumPressure", "sample_pressure"]),
            humidity: strings(&["RelativeHumidity", "Humidity", "RH", "sample_humidity"]),
        }
    }

    #[must_use]
    pub fn for_quantity(&self, quantity: EnvironmentQuantity) -> &[String] {
        match quantity {
            EnvironmentQuantity::Temperature => &self.temperature,
            EnvironmentQuantity::Pressure => &self.pressure,
            EnvironmentQuantity::Humidity => &self.humidity,
        }
    }
}

/// Fixed defaults and log-channel aliases of one instrument.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct InstrumentProfile {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub beamline: Option<String>,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub laboratory: Option<String>,
    #[serde(default)]
    pub probe: Option<String>,
    #[serde(default)]
    pub technique: Option<String>,
    #[serde(default)]
    pub technique_description: Option<String>,
    /// Treat a zero temperature reading as "sensor not connected".
    #[serde(default)]
    pub ignore_zero_readings: bool,
    #[serde(default = "LogChannelAliases::generic")]
    pub log_channels: LogChannelAliases,
}

impl InstrumentProfile {
    /// Profile with no defaults and the generic log channels.
    #[must_use]
    pub fn generic() -> Self {
        Self {
            name: GENERIC_PROFILE_NAME.to_string(),
            aliases: Vec::new(),
            beamline: None,
            facility: None,
            laboratory: None,
            probe: None,
            technique: None,
            technique_description: None,
            ignore_zero_readings: false,
            log_channels: LogChannelAliases::generic(),
        }
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.name == GENERIC_PROFILE_NAME
    }

    /// Canonical name followed by aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Case-insensitive equality with the name or any alias.
    #[must_use]
    pub fn matches_exactly(&self, identifier: &str) -> bool {
        let needle = identifier.trim().to_lowercase();
        self.names().any(|n| n.to_lowercase() == needle)
    }

    /// Length of the longest name or alias contained in `identifier`,
    /// compared case-insensitively.
    #[must_use]
    pub fn longest_contained_name(&self, identifier: &str) -> Option<usize> {
        let haystack = identifier.to_lowercase();
        self.names()
            .filter(|n| !n.is_empty() && haystack.contains(&n.to_lowercase()))
            .map(str::len)
            .max()
    }

    #[must_use]
    pub fn log_channel_aliases(&self, quantity: EnvironmentQuantity) -> &[String] {
        self.log_channels.for_quantity(quantity)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}
