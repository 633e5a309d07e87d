//! Co-refinement dataset selection.
//!
//! A model file may hold several experiments fitted together. The selector
//! decides which one describes the measured sample:
//!
//! - an explicit index is validated against the experiment count;
//! - a single experiment is taken as is;
//! - otherwise each experiment's probe R(Q) is linearly interpolated onto
//!   the observed Q grid and scored by mean relative deviation.
//!
//! Interpolation policy: observed points outside the probe's Q range are
//! excluded (never extrapolated), and points whose observed R is zero or
//! non-finite are skipped. The lowest score wins; ties go to the lowest
//! index. Every experiment that could not be scored gets a warning; when
//! none overlaps, index 0 is used and flagged.

use refl_core::enums::{RecordKind, SelectionMode};
use refl_core::provenance::ReviewFlag;
use refl_core::report::{ExperimentScore, SelectionReport};
use refl_core::sources::{Experiment, MeasurementSource, ModelSource, ProbeCurve};

use crate::error::SelectionError;

/// Outcome of dataset selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub mode: SelectionMode,
    pub experiment_count: usize,
    pub scores: Vec<ExperimentScore>,
    pub warnings: Vec<String>,
    pub review_flags: Vec<ReviewFlag>,
}

impl Selection {
    #[must_use]
    pub fn report(&self) -> SelectionReport {
        SelectionReport {
            selected_index: self.index,
            mode: self.mode,
            experiment_count: self.experiment_count,
            scores: self.scores.clone(),
        }
    }
}

/// Choose the experiment that matches the observed measurement.
///
/// # Errors
///
/// Returns [`SelectionError::IndexOutOfRange`] when `explicit` does not name
/// an experiment.
pub fn select_dataset(
    model: &ModelSource,
    observed: &MeasurementSource,
    explicit: Option<usize>,
) -> Result<Selection, SelectionError> {
    let count = model.experiments.len();

    if let Some(index) = explicit {
        if index >= count {
            return Err(SelectionError::IndexOutOfRange { index, count });
        }
        tracing::debug!(index, count, "using explicit dataset index");
        return Ok(selection(index, SelectionMode::Explicit, count, Vec::new()));
    }

    if count == 1 {
        return Ok(selection(0, SelectionMode::SingleExperiment, count, Vec::new()));
    }

    let scores: Vec<ExperimentScore> = model
        .experiments
        .iter()
        .enumerate()
        .map(|(index, experiment)| score_experiment(index, experiment, observed))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for entry in &scores {
        if let Some(score) = entry.score {
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((entry.index, score));
            }
        }
    }

    let warnings = unscored_warnings(&scores, &model.experiments);

    if let Some((index, score)) = best {
        tracing::debug!(index, score, count, "auto-detected co-refinement dataset");
        let mut result = selection(index, SelectionMode::AutoDetected, count, scores);
        result.warnings = warnings;
        return Ok(result);
    }

    let mut result = selection(0, SelectionMode::Fallback, count, Vec::new());
    result.warnings = warnings;
    result.review_flags.push(ReviewFlag::new(
        RecordKind::Sample,
        "dataset_index",
        format!("auto-detection was not possible across {count} experiments; defaulted to index 0"),
    ));
    result.scores = scores;
    tracing::warn!(count, "dataset auto-detection failed, falling back to index 0");
    Ok(result)
}

fn selection(
    index: usize,
    mode: SelectionMode,
    count: usize,
    scores: Vec<ExperimentScore>,
) -> Selection {
    Selection {
        index,
        mode,
        experiment_count: count,
        scores,
        warnings: Vec::new(),
        review_flags: Vec::new(),
    }
}

/// One warning per experiment that produced no score.
fn unscored_warnings(scores: &[ExperimentScore], experiments: &[Experiment]) -> Vec<String> {
    scores
        .iter()
        .zip(experiments)
        .filter(|(entry, _)| entry.score.is_none())
        .map(|(entry, experiment)| {
            let label = experiment_label(entry.index, experiment);
            if experiment.probe.is_none() {
                format!("{label} has no probe curve to compare against")
            } else {
                format!("{label}: no observed points fall inside the probe Q range")
            }
        })
        .collect()
}

fn experiment_label(index: usize, experiment: &Experiment) -> String {
    match &experiment.name {
        Some(name) => format!("experiment {index} ('{name}')"),
        None => format!("experiment {index}"),
    }
}

fn score_experiment(
    index: usize,
    experiment: &Experiment,
    observed: &MeasurementSource,
) -> ExperimentScore {
    let (score, overlapping_points) = experiment
        .probe
        .as_ref()
        .map_or((None, 0), |probe| score_probe(probe, observed));
    ExperimentScore {
        index,
        name: experiment.name.clone(),
        score,
        overlapping_points,
    }
}

/// Mean |R_model - R_obs| / |R_obs| over the overlapping points.
fn score_probe(probe: &ProbeCurve, observed: &MeasurementSource) -> (Option<f64>, usize) {
    let curve = sorted_curve(probe);
    let mut total = 0.0;
    let mut points = 0_usize;
    for (&q, &r_obs) in observed.q.iter().zip(&observed.r) {
        if !q.is_finite() || !r_obs.is_finite() || r_obs == 0.0 {
            continue;
        }
        let Some(r_model) = interpolate(&curve, q) else {
            continue;
        };
        total += (r_model - r_obs).abs() / r_obs.abs();
        points += 1;
    }
    if points == 0 {
        return (None, 0);
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = total / points as f64;
    (Some(mean), points)
}

/// Finite probe points sorted by Q.
fn sorted_curve(probe: &ProbeCurve) -> Vec<(f64, f64)> {
    let mut curve: Vec<(f64, f64)> = probe
        .q
        .iter()
        .zip(&probe.r)
        .map(|(&q, &r)| (q, r))
        .filter(|(q, r)| q.is_finite() && r.is_finite())
        .collect();
    curve.sort_by(|a, b| a.0.total_cmp(&b.0));
    curve
}

/// Linear interpolation on a Q-sorted curve. `None` outside its range.
fn interpolate(curve: &[(f64, f64)], q: f64) -> Option<f64> {
    let idx = curve.partition_point(|(cq, _)| *cq < q);
    let upper = curve.get(idx)?;
    if upper.0 == q {
        return Some(upper.1);
    }
    if idx == 0 {
        return None;
    }
    let lower = curve[idx - 1];
    let t = (q - lower.0) / (upper.0 - lower.0);
    Some(lower.1 + t * (upper.1 - lower.1))
}
