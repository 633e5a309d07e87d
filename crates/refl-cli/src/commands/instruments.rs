use anyhow::Context;
use refl_assembler::InstrumentRegistry;
use refl_config::AssemblerConfig;
use refl_core::instrument::InstrumentProfile;
use serde::Serialize;

use crate::cli::{GlobalFlags, OutputFormat};
use crate::output::output;

/// Flattened profile for table output.
#[derive(Debug, Serialize)]
struct ProfileRow<'a> {
    name: &'a str,
    aliases: &'a [String],
    facility: Option<&'a str>,
    beamline: Option<&'a str>,
    probe: Option<&'a str>,
    temperature: &'a [String],
    pressure: &'a [String],
    humidity: &'a [String],
}

impl<'a> From<&'a InstrumentProfile> for ProfileRow<'a> {
    fn from(profile: &'a InstrumentProfile) -> Self {
        Self {
            name: &profile.name,
            aliases: &profile.aliases,
            facility: profile.facility.as_deref(),
            beamline: profile.beamline.as_deref(),
            probe: profile.probe.as_deref(),
            temperature: &profile.log_channels.temperature,
            pressure: &profile.log_channels.pressure,
            humidity: &profile.log_channels.humidity,
        }
    }
}

/// Handle `reflasm instruments`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    let config = AssemblerConfig::load_with_dotenv().context("failed to load configuration")?;
    let registry = InstrumentRegistry::from_config(&config);
    let profiles = effective_profiles(&registry);

    match flags.format {
        OutputFormat::Table => {
            let rows = profiles.iter().copied().map(ProfileRow::from).collect::<Vec<_>>();
            output(&rows, flags.format)
        }
        OutputFormat::Json | OutputFormat::Raw => output(&profiles, flags.format),
    }
}

/// Known profiles followed by the generic fallback.
fn effective_profiles(registry: &InstrumentRegistry) -> Vec<&InstrumentProfile> {
    registry
        .profiles()
        .iter()
        .chain(std::iter::once(registry.generic()))
        .collect()
}
