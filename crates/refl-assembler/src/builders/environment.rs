use refl_core::enums::{EnvironmentQuantity, RecordKind, SourceTag};
use refl_core::ids::new_record_id;
use refl_core::instrument::InstrumentProfile;
use refl_core::records::EnvironmentRecord;
use refl_core::sources::{Experiment, MetadataSource};

use super::{BuildOutput, FieldLedger, METADATA_NOT_PROVIDED, MODEL_NOT_PROVIDED};
use crate::error::BuildError;

/// Description used when no condition could be resolved.
pub const STANDARD_CONDITIONS: &str = "Standard conditions";

/// Sources for the Environment record.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentInputs<'a> {
    pub metadata: Option<&'a MetadataSource>,
    pub profile: &'a InstrumentProfile,
    /// The selected model experiment, for the ambient medium.
    pub experiment: Option<&'a Experiment>,
    /// Free-text description supplied by the caller.
    pub description: Option<&'a str>,
}

/// Build the Environment record.
///
/// Each quantity is read from the first of the profile's log channel aliases
/// that carries a usable average.
///
/// # Errors
///
/// Returns [`BuildError::InconsistentLogChannel`] when a matched channel
/// reports a minimum above its maximum.
pub fn build_environment(
    inputs: &EnvironmentInputs<'_>,
) -> Result<BuildOutput<EnvironmentRecord>, BuildError> {
    let mut ledger = FieldLedger::new(RecordKind::Environment);
    let mut record = EnvironmentRecord {
        id: new_record_id(),
        sample_id: None,
        description: None,
        ambient_medium: None,
        temperature: None,
        pressure: None,
        relative_humidity: None,
        measurement_ids: Vec::new(),
    };

    for quantity in EnvironmentQuantity::ALL {
        let value = resolve_quantity(&mut ledger, inputs, quantity)?;
        record.set_quantity(quantity, value);
    }

    record.ambient_medium = match inputs.experiment {
        Some(experiment) => experiment.ambient().map(|layer| layer.material.name.clone()),
        None => None,
    };
    if record.ambient_medium.is_some() {
        ledger.from_source("ambient_medium", SourceTag::Model);
    } else if inputs.experiment.is_some() {
        ledger.unresolved("ambient_medium", "selected experiment has no layers");
    } else {
        ledger.absent("ambient_medium", MODEL_NOT_PROVIDED);
    }

    record.description = Some(describe(&mut ledger, &record, inputs.description));

    tracing::debug!(
        id = %record.id,
        temperature = ?record.temperature,
        pressure = ?record.pressure,
        relative_humidity = ?record.relative_humidity,
        "built environment record"
    );
    Ok(ledger.finish(record))
}

fn resolve_quantity(
    ledger: &mut FieldLedger,
    inputs: &EnvironmentInputs<'_>,
    quantity: EnvironmentQuantity,
) -> Result<Option<f64>, BuildError> {
    let field = quantity.field_name();
    let aliases = inputs.profile.log_channel_aliases(quantity);

    let Some(metadata) = inputs.metadata else {
        ledger.unresolved(field, METADATA_NOT_PROVIDED);
        return Ok(None);
    };
    if aliases.is_empty() {
        ledger.unresolved(
            field,
            format!(
                "instrument profile '{}' defines no {quantity} log channels",
                inputs.profile.name
            ),
        );
        return Ok(None);
    }

    for alias in aliases {
        let Some(channel) = metadata.log(alias) else {
            continue;
        };
        if let (Some(min), Some(max)) = (channel.min, channel.max) {
            if min > max {
                return Err(BuildError::InconsistentLogChannel {
                    channel: alias.clone(),
                    min,
                    max,
                });
            }
        }
        let Some(average) = channel.usable_average() else {
            continue;
        };
        if quantity == EnvironmentQuantity::Temperature
            && inputs.profile.ignore_zero_readings
            && average == 0.0
        {
            tracing::debug!(channel = %alias, "ignoring zero temperature reading");
            continue;
        }
        tracing::debug!(%quantity, channel = %alias, average, "resolved log channel");
        ledger.from_source(field, SourceTag::Metadata);
        return Ok(Some(average));
    }

    ledger.unresolved(
        field,
        format!("no usable {quantity} log channel (checked: {})", aliases.join(", ")),
    );
    Ok(None)
}

fn describe(
    ledger: &mut FieldLedger,
    record: &EnvironmentRecord,
    override_text: Option<&str>,
) -> String {
    if let Some(text) = override_text.map(str::trim).filter(|t| !t.is_empty()) {
        ledger.from_source("description", SourceTag::Caller);
        return text.to_string();
    }

    let parts: Vec<String> = EnvironmentQuantity::ALL
        .into_iter()
        .filter_map(|q| {
            record
                .quantity(q)
                .map(|value| format!("{}={value:.1}{}", q.symbol(), q.unit()))
        })
        .collect();
    if parts.is_empty() {
        ledger.defaulted("description", SourceTag::Builtin, "no conditions resolved");
        STANDARD_CONDITIONS.to_string()
    } else {
        ledger.from_source("description", SourceTag::Derived);
        parts.join(", ")
    }
}
