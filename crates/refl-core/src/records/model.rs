use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::LayerRecord;

/// The fitted model a measurement was analysed with.
///
/// Layers are those of the selected co-refinement experiment. `model_json`
/// keeps the whole model document so the fit can be reproduced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ModelRecord {
    pub id: String,
    pub model_name: Option<String>,
    pub model_file_path: Option<String>,
    pub software: Option<String>,
    pub software_version: Option<String>,
    pub schema_version: Option<String>,
    pub num_experiments: u32,
    pub dataset_index: Option<u32>,
    pub num_parameters: Option<u32>,
    pub num_free_parameters: Option<u32>,
    pub layers: Vec<LayerRecord>,
    pub model_json: Option<String>,
    pub measurement_ids: Vec<String>,
}
