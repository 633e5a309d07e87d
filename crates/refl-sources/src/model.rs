//! Reader for refl1d/bumps model JSON.
//!
//! Parameters appear in several shapes and are all reduced to a number:
//! a bare number, `{"slot": {"value": x}}`, `{"value": x}` or a
//! `{"__class__": "Reference", "id": ...}` pointer into the top-level
//! `references` map. A `FitProblem` lists its experiments under
//! `object.models`; a single experiment sits directly under `object`.

use std::path::Path;

use refl_core::sources::{
    Experiment, Layer, Material, ModelSoftware, ModelSource, ParameterCounts, ProbeCurve,
};
use serde_json::{Map, Value};

use crate::error::SourceError;

/// Libraries checked for software provenance, most specific first.
const SOFTWARE_LIBRARIES: [&str; 2] = ["refl1d", "bumps"];

type References = Map<String, Value>;

/// Read and parse a model file.
///
/// # Errors
///
/// Returns [`SourceError::Io`], [`SourceError::Json`] or
/// [`SourceError::ModelLayout`].
pub fn read_model(path: &Path) -> Result<ModelSource, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
    parse_model(&content, Some(&path.display().to_string()))
}

/// Parse model JSON text.
///
/// # Errors
///
/// Returns [`SourceError::Json`] for malformed JSON and
/// [`SourceError::ModelLayout`] when no experiment can be found.
pub fn parse_model(content: &str, source_path: Option<&str>) -> Result<ModelSource, SourceError> {
    let root: Value = serde_json::from_str(content)?;
    let empty = References::new();
    let references = root
        .get("references")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let object = root
        .get("object")
        .ok_or_else(|| SourceError::ModelLayout("missing 'object'".into()))?;

    let experiments = match object.get("models").and_then(Value::as_array) {
        Some(models) => models
            .iter()
            .map(|m| parse_experiment(resolve_reference(m, references), references))
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![parse_experiment(object, references)?],
    };

    let mut model = ModelSource::new(experiments)?.with_raw_json(serde_json::to_string(&root)?);
    if let Some(path) = source_path {
        model = model.with_source_path(path);
    }
    if let Some(name) = object.get("name").and_then(Value::as_str) {
        model = model.with_name(name);
    }
    if let Some(software) = parse_software(&root) {
        model = model.with_software(software);
    }
    if let Some(references) = root.get("references").and_then(Value::as_object) {
        model = model.with_parameters(count_parameters(references));
    }

    tracing::debug!(
        experiments = model.experiments.len(),
        software = ?model.software.as_ref().map(|s| &s.name),
        "parsed model"
    );
    Ok(model)
}

fn parse_experiment(value: &Value, references: &References) -> Result<Experiment, SourceError> {
    let sample = value
        .get("sample")
        .map(|s| resolve_reference(s, references))
        .ok_or_else(|| SourceError::ModelLayout("experiment has no 'sample'".into()))?;
    let layers = sample
        .get("layers")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::ModelLayout("sample has no 'layers' array".into()))?
        .iter()
        .map(|l| parse_layer(resolve_reference(l, references), references))
        .collect();

    Ok(Experiment {
        name: value.get("name").and_then(Value::as_str).map(str::to_string),
        layers,
        probe: value
            .get("probe")
            .and_then(|p| parse_probe(resolve_reference(p, references))),
    })
}

fn parse_layer(value: &Value, references: &References) -> Layer {
    let material = value
        .get("material")
        .map_or(&Value::Null, |m| resolve_reference(m, references));
    Layer {
        name: string_field(value, "name"),
        thickness: parameter(value.get("thickness"), references),
        interface: parameter(value.get("interface"), references),
        material: Material {
            name: string_field(material, "name"),
            rho: parameter(material.get("rho"), references),
            irho: parameter(material.get("irho"), references),
        },
    }
}

fn parse_probe(value: &Value) -> Option<ProbeCurve> {
    let (Some(q), Some(r)) = (numeric_array(value.get("Q")?), numeric_array(value.get("R")?)) else {
        tracing::debug!("ignoring probe curve with non-numeric entries");
        return None;
    };
    if q.is_empty() || q.len() != r.len() {
        tracing::debug!(q = q.len(), r = r.len(), "ignoring unusable probe curve");
        return None;
    }
    Some(ProbeCurve { q, r })
}

/// Plain arrays or `NumpyArray {"values": [...]}`.
///
/// `null` entries read as NaN so Q and R stay aligned; any other
/// non-numeric entry rejects the whole array.
fn numeric_array(value: &Value) -> Option<Vec<f64>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => obj.get("values").and_then(Value::as_array)?,
        _ => return None,
    };
    items
        .iter()
        .map(|item| match item {
            Value::Null => Some(f64::NAN),
            other => other.as_f64(),
        })
        .collect()
}

/// Every entry of `references` is a parameter; those without
/// `"fixed": false` are held fixed.
fn count_parameters(references: &References) -> ParameterCounts {
    let free = references
        .values()
        .filter(|entry| entry.get("fixed").and_then(Value::as_bool) == Some(false))
        .count();
    ParameterCounts {
        total: u32::try_from(references.len()).unwrap_or(u32::MAX),
        free: u32::try_from(free).unwrap_or(u32::MAX),
    }
}

/// Follow a `Reference` pointer, or return the value itself.
fn resolve_reference<'a>(value: &'a Value, references: &'a References) -> &'a Value {
    if value.get("__class__").and_then(Value::as_str) == Some("Reference") {
        if let Some(target) = value
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| references.get(id))
        {
            return target;
        }
    }
    value
}

/// Resolve a parameter to a number. Missing parameters read as 0.
fn parameter(value: Option<&Value>, references: &References) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    let value = resolve_reference(value, references);
    if let Some(n) = value.as_f64() {
        return n;
    }
    value
        .get("slot")
        .map(|slot| resolve_reference(slot, references))
        .and_then(|slot| slot.get("value"))
        .and_then(Value::as_f64)
        .or_else(|| value.get("value").and_then(Value::as_f64))
        .unwrap_or(0.0)
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

fn parse_software(root: &Value) -> Option<ModelSoftware> {
    let schema_version = root.get("$schema").and_then(Value::as_str).map(str::to_string);
    let libraries = root.get("libraries").and_then(Value::as_object);

    let from_library = libraries.and_then(|libs| {
        SOFTWARE_LIBRARIES.iter().find_map(|name| {
            let entry = libs.get(*name)?;
            let version = match entry {
                Value::String(v) => Some(v.clone()),
                other => other.get("version").and_then(Value::as_str).map(str::to_string),
            };
            Some(ModelSoftware {
                name: (*name).to_string(),
                version,
                schema_version: schema_version.clone(),
            })
        })
    });

    from_library.or_else(|| {
        schema_version.map(|schema| ModelSoftware {
            name: "bumps".to_string(),
            version: None,
            schema_version: Some(schema),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SINGLE: &str = r#"{
        "$schema": "bumps-draft-02",
        "libraries": {"bumps": {"version": "1.0.0"}, "refl1d": {"version": "1.0.0a12"}},
        "references": {
            "p-thick": {"__class__": "bumps.parameter.Parameter", "name": "Cu thickness",
                        "fixed": false,
                        "slot": {"__class__": "bumps.parameter.Variable", "value": 481.9}},
            "p-rho": {"__class__": "bumps.parameter.Parameter", "slot": {"value": 6.4}}
        },
        "object": {
            "name": "cu_thf",
            "sample": {"layers": [
                {"name": "THF", "thickness": 0, "interface": 12.0,
                 "material": {"name": "THF", "rho": 5.8, "irho": 0.0}},
                {"name": "Cu", "thickness": {"__class__": "Reference", "id": "p-thick"},
                 "interface": {"value": 8.2},
                 "material": {"name": "Cu", "rho": {"__class__": "Reference", "id": "p-rho"}}},
                {"name": "Si", "thickness": 0, "interface": 3.0,
                 "material": {"name": "Si", "rho": 2.07, "irho": 0.0}}
            ]},
            "probe": {
                "Q": {"__class__": "bumps.util.NumpyArray", "values": [0.01, 0.02]},
                "R": [0.9, 0.4]
            }
        }
    }"#;

    #[test]
    fn parses_single_experiment() {
        let model = parse_model(SINGLE, Some("model.json")).unwrap();
        assert_eq!(model.experiments.len(), 1);
        let exp = &model.experiments[0];
        assert_eq!(exp.name.as_deref(), Some("cu_thf"));
        assert_eq!(exp.layers.len(), 3);
        assert_eq!(exp.layers[1].thickness, 481.9);
        assert_eq!(exp.layers[1].interface, 8.2);
        assert_eq!(exp.layers[1].material.rho, 6.4);
        assert_eq!(exp.layers[1].material.irho, 0.0);
        assert_eq!(
            exp.probe,
            Some(ProbeCurve {
                q: vec![0.01, 0.02],
                r: vec![0.9, 0.4],
            })
        );
        assert_eq!(model.source_path.as_deref(), Some("model.json"));
    }

    #[test]
    fn prefers_refl1d_software() {
        let model = parse_model(SINGLE, None).unwrap();
        assert_eq!(
            model.software,
            Some(ModelSoftware {
                name: "refl1d".into(),
                version: Some("1.0.0a12".into()),
                schema_version: Some("bumps-draft-02".into()),
            })
        );
    }

    #[test]
    fn reads_fit_summary() {
        let model = parse_model(SINGLE, None).unwrap();
        assert_eq!(model.name.as_deref(), Some("cu_thf"));
        assert_eq!(model.parameters, Some(ParameterCounts { total: 2, free: 1 }));
        let stored: Value = serde_json::from_str(model.raw_json.as_deref().unwrap()).unwrap();
        assert_eq!(stored, serde_json::from_str::<Value>(SINGLE).unwrap());
    }

    #[test]
    fn probe_with_text_entry_is_dropped() {
        let json = r#"{"object": {"sample": {"layers": []},
            "probe": {"Q": [0.01, "0.02", 0.03], "R": [1.0, 0.5, 0.2]}}}"#;
        let model = parse_model(json, None).unwrap();
        assert!(model.experiments[0].probe.is_none());
    }

    #[test]
    fn null_probe_entries_keep_q_and_r_aligned() {
        let json = r#"{"object": {"sample": {"layers": []},
            "probe": {"Q": [0.01, null, 0.03], "R": {"values": [1.0, 0.5, 0.2]}}}}"#;
        let probe = parse_model(json, None).unwrap().experiments[0].probe.clone().unwrap();
        assert_eq!(probe.q.len(), 3);
        assert!(probe.q[1].is_nan());
        assert_eq!(probe.q[2], 0.03);
        assert_eq!(probe.r, vec![1.0, 0.5, 0.2]);
    }

    #[test]
    fn parses_fit_problem_models() {
        let json = r#"{
            "object": {"models": [
                {"name": "a", "sample": {"layers": [{"name": "air", "material": {"name": "air"}}]}},
                {"name": "b", "sample": {"layers": [{"name": "D2O", "material": {"name": "D2O"}}]},
                 "probe": {"Q": [0.1], "R": []}}
            ]}
        }"#;
        let model = parse_model(json, None).unwrap();
        assert_eq!(model.experiments.len(), 2);
        assert_eq!(model.experiments[1].name.as_deref(), Some("b"));
        assert!(model.experiments[1].probe.is_none());
        assert!(model.software.is_none());
        assert!(model.parameters.is_none());
    }

    #[test]
    fn empty_models_list_is_rejected() {
        let err = parse_model(r#"{"object": {"models": []}}"#, None).unwrap_err();
        assert!(matches!(err, SourceError::Contract(_)));
    }

    #[test]
    fn missing_object_is_layout_error() {
        let err = parse_model("{}", None).unwrap_err();
        assert!(matches!(err, SourceError::ModelLayout(_)));
    }
}
