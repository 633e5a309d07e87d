use refl_core::enums::{Geometry, RecordKind, SourceTag};
use refl_core::ids::new_record_id;
use refl_core::records::{LayerRecord, SampleRecord};
use refl_core::sources::{Experiment, Layer, MeasurementSource, MetadataSource, ModelSource};

use super::{BuildOutput, FieldLedger, MODEL_NOT_PROVIDED, check_layers, dataset_index, run_title};
use crate::error::BuildError;
use crate::selector::Selection;

/// Layer names that carry no information about the material.
const GENERIC_LAYER_NAMES: [&str; 3] = ["material", "layer", "film"];

const MODEL_FIELDS: [&str; 6] = [
    "layers",
    "main_composition",
    "substrate",
    "dataset_index",
    "experiment_name",
    "experiment_count",
];

/// Build the Sample record from the selected experiment of `model`.
///
/// Without a model the description falls back to the run title and every
/// model-derived field is unresolved.
///
/// # Errors
///
/// Returns [`BuildError::NonFiniteLayer`] when a layer of the selected
/// experiment has a NaN or infinite thickness, roughness or SLD.
pub fn build_sample(
    model: Option<(&ModelSource, &Selection)>,
    measurement: &MeasurementSource,
    metadata: Option<&MetadataSource>,
) -> Result<BuildOutput<SampleRecord>, BuildError> {
    let mut ledger = FieldLedger::new(RecordKind::Sample);
    let mut record = SampleRecord {
        id: new_record_id(),
        description: None,
        main_composition: None,
        geometry: None,
        layers: Vec::new(),
        substrate: None,
        dataset_index: None,
        experiment_name: None,
        experiment_count: None,
        environment_ids: Vec::new(),
    };

    let experiment = model.and_then(|(source, selection)| {
        source
            .experiment(selection.index)
            .map(|experiment| (source, selection, experiment))
    });

    let mut derived_description = None;
    if let Some((source, selection, experiment)) = experiment {
        check_layers(experiment)?;
        derived_description =
            fill_from_model(&mut ledger, &mut record, source, selection, experiment);
    } else {
        for field in MODEL_FIELDS {
            ledger.unresolved(field, MODEL_NOT_PROVIDED);
        }
    }

    record.description = if let Some(description) = derived_description {
        ledger.from_source("description", SourceTag::Derived);
        Some(description)
    } else if let Some((title, source)) = run_title(measurement, metadata) {
        ledger.from_source("description", source);
        Some(title)
    } else {
        ledger.unresolved("description", "no layer stack or run title to describe the sample");
        None
    };

    record.geometry = measurement
        .scattering_angle
        .and_then(Geometry::from_scattering_angle)
        .map(|g| g.as_str().to_string());
    if record.geometry.is_some() {
        ledger.from_source("geometry", SourceTag::Derived);
    } else {
        ledger.unresolved("geometry", "scattering angle missing from reduced header");
    }

    tracing::debug!(id = %record.id, layers = record.layers.len(), "built sample record");
    Ok(ledger.finish(record))
}

/// Fill the model-derived fields. Returns the derived description when the
/// stack names ambient, main composition and substrate.
fn fill_from_model(
    ledger: &mut FieldLedger,
    record: &mut SampleRecord,
    source: &ModelSource,
    selection: &Selection,
    experiment: &Experiment,
) -> Option<String> {
    record.layers = experiment
        .layers
        .iter()
        .zip(0_u32..)
        .map(|(layer, n)| LayerRecord::from_layer(n, layer))
        .collect();
    ledger.from_source("layers", SourceTag::Model);
    for layer in &record.layers {
        if GENERIC_LAYER_NAMES.contains(&layer.name.trim().to_lowercase().as_str()) {
            ledger.flag(
                &format!("layers[{}].name", layer.layer_number),
                format!("generic layer name '{}' does not identify the material", layer.name),
            );
        }
    }

    record.substrate = record.layers.last().cloned().filter(|_| experiment.substrate().is_some());
    if record.substrate.is_some() {
        ledger.from_source("substrate", SourceTag::Model);
    } else {
        ledger.unresolved("substrate", "layer stack has fewer than two layers");
    }

    record.main_composition =
        thickest(experiment.inner_layers()).map(|layer| layer.material.name.clone());
    if record.main_composition.is_some() {
        ledger.from_source("main_composition", SourceTag::Derived);
    } else {
        ledger.unresolved("main_composition", "no layers between ambient and substrate");
    }

    record.dataset_index = dataset_index(ledger, selection);

    record.experiment_name = Some(if let Some(name) = &experiment.name {
        ledger.from_source("experiment_name", SourceTag::Model);
        name.clone()
    } else {
        ledger.defaulted("experiment_name", SourceTag::Builtin, "model experiment is unnamed");
        format!("experiment {}", selection.index)
    });

    record.experiment_count = u32::try_from(source.experiments.len()).ok();
    ledger.from_source("experiment_count", SourceTag::Model);

    let ambient = experiment.ambient()?;
    let substrate = experiment.substrate()?;
    let main = record.main_composition.as_ref()?;
    Some(format!("{main} in {} on {}", ambient.material.name, substrate.material.name))
}

/// Thickest layer; ties go to the first.
fn thickest(layers: &[Layer]) -> Option<&Layer> {
    let mut best: Option<&Layer> = None;
    for layer in layers {
        if best.is_none_or(|b| layer.thickness > b.thickness) {
            best = Some(layer);
        }
    }
    best
}
