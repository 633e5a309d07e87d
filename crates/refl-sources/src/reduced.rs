//! Reader for reduced reflectivity text files.
//!
//! Layout: `#` header lines followed by whitespace-separated data rows with
//! at least four numeric columns (Q, R, dR, dQ). Rows that do not parse are
//! skipped. Recognised header lines:
//!
//! ```text
//! # Experiment IPTS-34347 Run 218386
//! # Reduction quicknxs v4.0.0
//! # Run title: Cu/Ti on Si in THF
//! # Run start time: 2025-04-20 14:30:00
//! # Reduction time: Mon Apr 21 08:00:00 2025
//! # DataRun NormRun TwoTheta(deg) LambdaMin LambdaMax Qmin Qmax SF_A SF_B
//! # 218386  218380  1.2           2.5       9.5       0.01 0.05 1.0  0.0
//! ```

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use refl_core::sources::{MeasurementSource, ReductionRun};

use crate::error::SourceError;

/// Read and parse a reduced-data file.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be read and
/// [`SourceError::NoData`] if no data row parses.
pub fn read_reduced(path: &Path) -> Result<MeasurementSource, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
    parse_reduced(&content, Some(&path.display().to_string()))
}

/// Parse reduced-data text.
///
/// # Errors
///
/// Returns [`SourceError::NoData`] if no data row parses.
pub fn parse_reduced(
    content: &str,
    source_path: Option<&str>,
) -> Result<MeasurementSource, SourceError> {
    let mut source = MeasurementSource {
        source_path: source_path.map(str::to_string),
        ..MeasurementSource::default()
    };

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(header) = line.strip_prefix('#') {
            parse_header_line(header.trim(), &mut source);
        } else if let Some([q, r, dr, dq]) = parse_data_row(line) {
            source.q.push(q);
            source.r.push(r);
            source.dr.push(dr);
            source.dq.push(dq);
        } else {
            tracing::debug!(line, "skipping malformed data row");
        }
    }

    if source.q.is_empty() {
        return Err(SourceError::NoData(
            source_path.unwrap_or("<reduced text>").to_string(),
        ));
    }

    if source.run_number.is_none() {
        source.run_number = source_path.and_then(run_number_from_file_name);
    }
    source.scattering_angle = source.runs.first().map(|run| run.two_theta);
    source.validate()?;

    tracing::debug!(
        points = source.len(),
        run = ?source.run_number,
        runs = source.runs.len(),
        "parsed reduced data"
    );
    Ok(source)
}

fn parse_header_line(line: &str, source: &mut MeasurementSource) {
    if let Some(value) = strip_label(line, "Run title:") {
        source.run_title = non_empty(value);
    } else if let Some(value) = strip_label(line, "Run start time:") {
        source.run_start = parse_timestamp(value);
    } else if let Some(value) = strip_label(line, "Reduction time:") {
        source.reduction_time = parse_timestamp(value);
    } else if let Some((proposal, run)) = parse_experiment(line) {
        source.proposal_id = Some(proposal);
        source.run_number = Some(run);
    } else if let Some(value) = strip_label(line, "Reduction ") {
        if source.reduction_version.is_none() {
            source.reduction_version = non_empty(value);
        }
    } else if let Some(run) = parse_run_row(line) {
        source.runs.push(run);
    }
}

/// Case-insensitive prefix strip returning the trimmed remainder.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| line[label.len()..].trim())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `Experiment IPTS-<n> Run <m>` anywhere in the line.
fn parse_experiment(line: &str) -> Option<(String, u64)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.windows(4).find_map(|w| {
        let is_ipts = strip_label(w[1], "IPTS-")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        if w[0].eq_ignore_ascii_case("experiment") && is_ipts && w[2].eq_ignore_ascii_case("run") {
            let run = w[3].parse::<u64>().ok()?;
            Some((w[1].to_uppercase(), run))
        } else {
            None
        }
    })
}

/// A run table row: two integer run numbers followed by at least five numbers.
fn parse_run_row(line: &str) -> Option<ReductionRun> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 7 {
        return None;
    }
    let data_run = tokens[0].parse::<u64>().ok()?;
    let norm_run = tokens[1].parse::<u64>().ok()?;
    let numbers = tokens[2..7]
        .iter()
        .map(|t| t.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    Some(ReductionRun {
        data_run,
        norm_run,
        two_theta: numbers[0],
        lambda_min: numbers[1],
        lambda_max: numbers[2],
        q_min: numbers[3],
        q_max: numbers[4],
    })
}

fn parse_data_row(line: &str) -> Option<[f64; 4]> {
    let mut tokens = line.split_whitespace();
    let mut row = [0.0; 4];
    for slot in &mut row {
        *slot = tokens.next()?.parse::<f64>().ok()?;
    }
    Some(row)
}

/// Parse a header timestamp. Naive forms are taken as UTC.
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%a %b %d %H:%M:%S %Y",
    ];
    let parsed = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc());
    if parsed.is_none() {
        tracing::warn!(text, "unrecognised timestamp in reduced header");
    }
    parsed
}

/// First run of 5 to 7 digits in the file name, e.g. `REF_L_218386_combined.txt`.
#[must_use]
pub fn run_number_from_file_name(path: &str) -> Option<u64> {
    let name = Path::new(path).file_name()?.to_str()?;
    name.split(|c: char| !c.is_ascii_digit())
        .find(|digits| (5..=7).contains(&digits.len()))
        .and_then(|digits| digits.parse().ok())
}
