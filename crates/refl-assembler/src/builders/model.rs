use refl_core::enums::{RecordKind, SourceTag};
use refl_core::ids::new_record_id;
use refl_core::records::{LayerRecord, ModelRecord};
use refl_core::sources::ModelSource;

use super::{BuildOutput, FieldLedger, check_layers, dataset_index};
use crate::error::BuildError;
use crate::selector::Selection;

/// Build the Model record for the experiment chosen by `selection`.
///
/// Missing fit details (name, software, parameter counts, the stored
/// document) are recorded as unresolved but not flagged. `measurement_ids`
/// is left empty for the orchestrator to link.
///
/// # Errors
///
/// Returns [`BuildError::NonFiniteLayer`] when a layer of the selected
/// experiment has a NaN or infinite value.
pub fn build_model(
    source: &ModelSource,
    selection: &Selection,
) -> Result<BuildOutput<ModelRecord>, BuildError> {
    let mut ledger = FieldLedger::new(RecordKind::Model);
    let mut record = ModelRecord {
        id: new_record_id(),
        model_name: source.name.clone(),
        model_file_path: source.source_path.clone(),
        software: None,
        software_version: None,
        schema_version: None,
        num_experiments: u32::try_from(source.experiments.len()).unwrap_or(u32::MAX),
        dataset_index: None,
        num_parameters: None,
        num_free_parameters: None,
        layers: Vec::new(),
        model_json: source.raw_json.clone(),
        measurement_ids: Vec::new(),
    };

    present(&mut ledger, "model_name", record.model_name.is_some(), "model has no name");
    present(
        &mut ledger,
        "model_file_path",
        record.model_file_path.is_some(),
        "model was not read from a file",
    );
    present(
        &mut ledger,
        "model_json",
        record.model_json.is_some(),
        "model was not read from a file",
    );
    ledger.from_source("num_experiments", SourceTag::Model);

    if let Some(software) = &source.software {
        record.software = Some(software.name.clone());
        record.software_version = software.version.clone();
        record.schema_version = software.schema_version.clone();
        ledger.from_source("software", SourceTag::Model);
        present(
            &mut ledger,
            "software_version",
            record.software_version.is_some(),
            "library entry has no version",
        );
        present(
            &mut ledger,
            "schema_version",
            record.schema_version.is_some(),
            "model has no '$schema'",
        );
    } else {
        ledger.warn("could not determine the modeling software from the model libraries");
        for field in ["software", "software_version", "schema_version"] {
            ledger.absent(field, "model names no modeling library");
        }
    }

    if let Some(parameters) = source.parameters {
        record.num_parameters = Some(parameters.total);
        record.num_free_parameters = Some(parameters.free);
        ledger.from_source("num_parameters", SourceTag::Model);
        ledger.from_source("num_free_parameters", SourceTag::Model);
    } else {
        for field in ["num_parameters", "num_free_parameters"] {
            ledger.absent(field, "model has no parameter references");
        }
    }

    record.dataset_index = dataset_index(&mut ledger, selection);
    if let Some(experiment) = source.experiment(selection.index) {
        check_layers(experiment)?;
        record.layers = experiment
            .layers
            .iter()
            .zip(0_u32..)
            .map(|(layer, n)| LayerRecord::from_layer(n, layer))
            .collect();
        ledger.from_source("layers", SourceTag::Model);
    } else {
        ledger.unresolved("layers", format!("model has no experiment {}", selection.index));
    }

    tracing::debug!(
        id = %record.id,
        software = ?record.software,
        layers = record.layers.len(),
        "built model record"
    );
    Ok(ledger.finish(record))
}

fn present(ledger: &mut FieldLedger, field: &str, found: bool, reason: &str) {
    if found {
        ledger.from_source(field, SourceTag::Model);
    } else {
        ledger.absent(field, reason);
    }
}
