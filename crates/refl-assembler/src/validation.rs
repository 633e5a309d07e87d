//! Cross-reference checks over the assembled records.

use crate::orchestrator::AssemblyResult;

/// Check that foreign keys are symmetric and point at records that exist.
/// Returns one message per violation.
#[must_use]
pub fn validate_links(result: &AssemblyResult) -> Vec<String> {
    let mut violations = Vec::new();
    let refl = &result.reflectivity;
    let sample = result.sample.as_ref();
    let environment = result.environment.as_ref();

    if refl.sample_id.as_deref() != sample.map(|s| s.id.as_str()) {
        violations.push(format!(
            "reflectivity.sample_id {:?} does not match the sample record",
            refl.sample_id
        ));
    }
    if refl.environment_id.as_deref() != environment.map(|e| e.id.as_str()) {
        violations.push(format!(
            "reflectivity.environment_id {:?} does not match the environment record",
            refl.environment_id
        ));
    }

    if let Some(sample) = sample {
        for env_id in &sample.environment_ids {
            if environment.is_none_or(|e| &e.id != env_id) {
                violations.push(format!(
                    "sample.environment_ids names unknown environment {env_id}"
                ));
            }
        }
    }

    if let Some(env) = environment {
        if !env.measurement_ids.contains(&refl.id) {
            violations.push(
                "environment.measurement_ids does not include the reflectivity record".to_string(),
            );
        }
        for measurement_id in &env.measurement_ids {
            if measurement_id != &refl.id {
                violations.push(format!(
                    "environment.measurement_ids names unknown measurement {measurement_id}"
                ));
            }
        }
        if env.sample_id.as_deref() != sample.map(|s| s.id.as_str()) {
            violations.push(format!(
                "environment.sample_id {:?} does not match the sample record",
                env.sample_id
            ));
        }
        if let Some(sample) = sample {
            if !sample.environment_ids.contains(&env.id) {
                violations.push(
                    "sample.environment_ids does not include the environment record".to_string(),
                );
            }
        }
    }

    if let Some(model) = &result.model {
        if !model.measurement_ids.contains(&refl.id) {
            violations.push(
                "model.measurement_ids does not include the reflectivity record".to_string(),
            );
        }
        for measurement_id in &model.measurement_ids {
            if measurement_id != &refl.id {
                violations.push(format!(
                    "model.measurement_ids names unknown measurement {measurement_id}"
                ));
            }
        }
    }

    violations
}
