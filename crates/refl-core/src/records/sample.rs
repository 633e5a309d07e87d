use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::sources::Layer;

/// A layer of the selected experiment's stack, numbered from 0 (ambient).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LayerRecord {
    pub layer_number: u32,
    pub name: String,
    pub material: String,
    pub thickness: f64,
    pub roughness: f64,
    pub sld: f64,
    pub isld: f64,
}

impl LayerRecord {
    #[must_use]
    pub fn from_layer(layer_number: u32, layer: &Layer) -> Self {
        Self {
            layer_number,
            name: layer.name.clone(),
            material: layer.material.name.clone(),
            thickness: layer.thickness,
            roughness: layer.interface,
            sld: layer.material.rho,
            isld: layer.material.irho,
        }
    }
}

/// The measured sample.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SampleRecord {
    pub id: String,
    pub description: Option<String>,
    pub main_composition: Option<String>,
    pub geometry: Option<String>,
    pub layers: Vec<LayerRecord>,
    pub substrate: Option<LayerRecord>,
    /// 0-based co-refinement dataset index, recorded in every selection mode.
    pub dataset_index: Option<u32>,
    pub experiment_name: Option<String>,
    pub experiment_count: Option<u32>,
    pub environment_ids: Vec<String>,
}
