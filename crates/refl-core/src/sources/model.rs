use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Scattering length density of a layer material.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Material {
    pub name: String,
    pub rho: f64,
    pub irho: f64,
}

/// One slab of a layer stack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Layer {
    pub name: String,
    pub thickness: f64,
    /// Interface (roughness) width to the next layer.
    pub interface: f64,
    pub material: Material,
}

impl Layer {
    /// True when thickness, interface and SLD values are all finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.thickness.is_finite()
            && self.interface.is_finite()
            && self.material.rho.is_finite()
            && self.material.irho.is_finite()
    }
}

/// Model reflectivity curve attached to an experiment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProbeCurve {
    pub q: Vec<f64>,
    pub r: Vec<f64>,
}

/// One fitted experiment: a layer stack and optionally its probe curve.
///
/// Layer 0 is the ambient medium, the last layer is the substrate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Experiment {
    pub name: Option<String>,
    pub layers: Vec<Layer>,
    pub probe: Option<ProbeCurve>,
}

impl Experiment {
    #[must_use]
    pub fn ambient(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// The substrate; `None` for a single-layer stack.
    #[must_use]
    pub fn substrate(&self) -> Option<&Layer> {
        if self.layers.len() < 2 {
            return None;
        }
        self.layers.last()
    }

    /// Layers strictly between ambient and substrate.
    #[must_use]
    pub fn inner_layers(&self) -> &[Layer] {
        if self.layers.len() <= 2 {
            return &[];
        }
        &self.layers[1..self.layers.len() - 1]
    }
}

/// Software that produced the model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ModelSoftware {
    pub name: String,
    pub version: Option<String>,
    pub schema_version: Option<String>,
}

/// Fit parameter counts taken from the model's `references` map.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ParameterCounts {
    pub total: u32,
    /// Parameters not marked `fixed`.
    pub free: u32,
}

/// Contents of a fitted-model file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ModelSource {
    pub source_path: Option<String>,
    /// Name of the fit problem.
    pub name: Option<String>,
    pub software: Option<ModelSoftware>,
    pub parameters: Option<ParameterCounts>,
    pub experiments: Vec<Experiment>,
    /// The model document as read, stored with the model record.
    pub raw_json: Option<String>,
}

impl ModelSource {
    /// Build a model source. A model always holds at least one experiment.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyModel`] if `experiments` is empty.
    pub fn new(experiments: Vec<Experiment>) -> Result<Self, CoreError> {
        if experiments.is_empty() {
            return Err(CoreError::EmptyModel);
        }
        Ok(Self {
            source_path: None,
            name: None,
            software: None,
            parameters: None,
            experiments,
            raw_json: None,
        })
    }

    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn with_parameters(mut self, parameters: ParameterCounts) -> Self {
        self.parameters = Some(parameters);
        self
    }

    #[must_use]
    pub fn with_raw_json(mut self, raw_json: impl Into<String>) -> Self {
        self.raw_json = Some(raw_json.into());
        self
    }

    #[must_use]
    pub fn with_software(mut self, software: ModelSoftware) -> Self {
        self.software = Some(software);
        self
    }

    #[must_use]
    pub fn experiment(&self, index: usize) -> Option<&Experiment> {
        self.experiments.get(index)
    }
}
