//! Instrument profile resolution.
//!
//! [`InstrumentRegistry`] is an immutable lookup table built once (from the
//! built-in profiles plus any configured ones) and passed by reference.
//! Lookup order for an identifier:
//!
//! 1. case-insensitive equality with a profile name or alias
//! 2. case-insensitive containment of a name or alias in the identifier
//!    (`REF_L_218386`, `/SNS/REF_L/IPTS-1/...`); the longest contained name wins
//! 3. the generic profile

use refl_config::AssemblerConfig;
use refl_core::enums::EnvironmentQuantity;
use refl_core::instrument::{InstrumentProfile, LogChannelAliases};

#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    profiles: Vec<InstrumentProfile>,
    generic: InstrumentProfile,
}

impl Default for InstrumentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl InstrumentRegistry {
    /// Registry holding exactly `profiles`.
    #[must_use]
    pub fn new(profiles: Vec<InstrumentProfile>) -> Self {
        Self {
            profiles,
            generic: InstrumentProfile::generic(),
        }
    }

    /// The profiles that ship with the assembler.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![ref_l(), ref_m()])
    }

    /// Built-ins overlaid with the configured profiles.
    #[must_use]
    pub fn from_config(config: &AssemblerConfig) -> Self {
        Self::builtin().with_overrides(&config.instruments)
    }

    /// Add profiles, replacing any existing profile with the same name.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &[InstrumentProfile]) -> Self {
        for profile in overrides {
            match self
                .profiles
                .iter_mut()
                .find(|p| p.name.eq_ignore_ascii_case(&profile.name))
            {
                Some(existing) => {
                    tracing::debug!(name = %profile.name, "overriding built-in instrument profile");
                    *existing = profile.clone();
                }
                None => self.profiles.push(profile.clone()),
            }
        }
        self
    }

    #[must_use]
    pub fn profiles(&self) -> &[InstrumentProfile] {
        &self.profiles
    }

    #[must_use]
    pub const fn generic(&self) -> &InstrumentProfile {
        &self.generic
    }

    /// Resolve one identifier; unknown identifiers get the generic profile.
    #[must_use]
    pub fn resolve(&self, identifier: &str) -> &InstrumentProfile {
        self.find(identifier).unwrap_or(&self.generic)
    }

    /// Resolve the first identifier that names a known instrument.
    #[must_use]
    pub fn resolve_first<'a, I>(&self, identifiers: I) -> &InstrumentProfile
    where
        I: IntoIterator<Item = &'a str>,
    {
        identifiers
            .into_iter()
            .find_map(|id| self.find(id))
            .unwrap_or(&self.generic)
    }

    /// Ordered log channel names for `quantity` on the resolved instrument.
    #[must_use]
    pub fn log_channel_aliases(
        &self,
        identifier: &str,
        quantity: EnvironmentQuantity,
    ) -> &[String] {
        self.resolve(identifier).log_channel_aliases(quantity)
    }

    fn find(&self, identifier: &str) -> Option<&InstrumentProfile> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        if let Some(profile) = self.profiles.iter().find(|p| p.matches_exactly(identifier)) {
            return Some(profile);
        }

        let mut best: Option<(&InstrumentProfile, usize)> = None;
        for profile in &self.profiles {
            if let Some(len) = profile.longest_contained_name(identifier) {
                if best.is_none_or(|(_, best_len)| len > best_len) {
                    best = Some((profile, len));
                }
            }
        }
        best.map(|(profile, _)| profile)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

/// Liquids Reflectometer, SNS beamline 4B.
fn ref_l() -> InstrumentProfile {
    let generic = LogChannelAliases::generic();
    InstrumentProfile {
        name: "REF_L".to_string(),
        aliases: strings(&["BL4B", "BL-4B"]),
        beamline: Some("BL-4B".to_string()),
        facility: Some("SNS".to_string()),
        laboratory: Some("ORNL".to_string()),
        probe: Some("neutrons".to_string()),
        technique: Some("reflectivity".to_string()),
        technique_description: Some("Specular neutron reflectometry".to_string()),
        ignore_zero_readings: true,
        log_channels: LogChannelAliases {
            temperature: strings(&["SampleTemp", "BL4B:SE:SampleTemp"]),
            ..generic
        },
    }
}

/// Magnetism Reflectometer, SNS beamline 4A.
fn ref_m() -> InstrumentProfile {
    InstrumentProfile {
        name: "REF_M".to_string(),
        aliases: strings(&["BL4A", "BL-4A"]),
        beamline: Some("BL-4A".to_string()),
        facility: Some("SNS".to_string()),
        laboratory: Some("ORNL".to_string()),
        probe: Some("neutrons".to_string()),
        technique: Some("reflectivity".to_string()),
        technique_description: Some("Polarized neutron reflectometry".to_string()),
        ignore_zero_readings: false,
        log_channels: LogChannelAliases::generic(),
    }
}
