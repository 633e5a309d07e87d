use std::path::Path;

use anyhow::{Context, bail};
use refl_assembler::{Assembler, AssemblyInputs, AssemblyResult, validate_links};
use refl_config::{AssemblerConfig, OutputConfig};
use refl_core::enums::AssemblyStatus;
use refl_core::report::AssemblyReport;
use refl_core::sources::MetadataSource;
use refl_lake::{LakeWriter, RecordSet, WrittenFiles};
use refl_schema::SchemaRegistry;
use serde::Serialize;

use crate::cli::{AssembleArgs, GlobalFlags};
use crate::output::output;

/// What `reflasm assemble` prints.
#[derive(Debug, Serialize)]
pub struct AssembleResponse {
    pub summary: String,
    pub dry_run: bool,
    pub written: Option<WrittenFiles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub report: AssemblyReport,
}

/// Handle `reflasm assemble`.
pub fn handle(args: &AssembleArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let config = AssemblerConfig::load_with_dotenv().context("failed to load configuration")?;
    let response = execute(args, &config)?;
    if !flags.quiet || response.error.is_some() {
        output(&response, flags.format)?;
    }

    if let Some(error) = response.error {
        bail!("assembly failed: {error}");
    }
    Ok(())
}

/// Read the inputs, assemble, validate and write.
///
/// A failed assembly is returned as a response carrying `error`; only I/O,
/// configuration and validation problems are `Err`.
pub fn execute(args: &AssembleArgs, config: &AssemblerConfig) -> anyhow::Result<AssembleResponse> {
    let measurement = refl_sources::read_reduced(&args.reduced)
        .with_context(|| format!("failed to read reduced file {}", args.reduced.display()))?;

    let mut input_warnings = Vec::new();
    let metadata = match &args.metadata {
        Some(dir) => read_metadata(dir, measurement.run_number, &mut input_warnings),
        None => None,
    };
    let model = match &args.model {
        Some(path) => Some(
            refl_sources::read_model(path)
                .with_context(|| format!("failed to read model file {}", path.display()))?,
        ),
        None => None,
    };

    let mut inputs = AssemblyInputs::new(&measurement);
    if let Some(metadata) = &metadata {
        inputs = inputs.with_metadata(metadata);
    }
    if let Some(model) = &model {
        inputs = inputs.with_model(model);
    }
    if let Some(index) = args.dataset_index {
        inputs = inputs.with_dataset_index(index);
    }
    if let Some(description) = args.environment_description.as_deref() {
        inputs = inputs.with_environment_description(description);
    }

    let assembler = Assembler::from_config(config);
    let writer = writer_for(args, &config.output);

    let mut result = match assembler.assemble(&inputs).into_result() {
        Ok(result) => result,
        Err(mut failure) => {
            prepend(&mut failure.warnings, input_warnings);
            let report = failure.report();
            let written = if args.dry_run {
                None
            } else {
                Some(
                    writer
                        .write(&RecordSet::default(), &report)
                        .context("failed to write assembly report")?,
                )
            };
            return Ok(AssembleResponse {
                summary: format!("{}: {}", AssemblyStatus::Failure, failure.error),
                dry_run: args.dry_run,
                written,
                error: Some(failure.error.to_string()),
                report,
            });
        }
    };
    prepend(&mut result.warnings, input_warnings);

    let violations = validate_links(&result);
    if !violations.is_empty() {
        bail!("records are not consistently linked: {}", violations.join("; "));
    }
    validate_records(&result)?;

    let report = result.report();
    let written = if args.dry_run {
        tracing::debug!("dry run; nothing written");
        None
    } else {
        let records = RecordSet {
            reflectivity: Some(&result.reflectivity),
            sample: result.sample.as_ref(),
            environment: result.environment.as_ref(),
            model: result.model.as_ref(),
        };
        let written = writer
            .write(&records, &report)
            .with_context(|| format!("failed to write records to {}", writer.root().display()))?;
        tracing::debug!(
            files = written.all().count(),
            root = %writer.root().display(),
            "records written"
        );
        Some(written)
    };

    Ok(AssembleResponse {
        summary: result.summary(),
        dry_run: args.dry_run,
        written,
        error: None,
        report,
    })
}

fn read_metadata(
    dir: &Path,
    run_number: Option<u64>,
    warnings: &mut Vec<String>,
) -> Option<MetadataSource> {
    match refl_sources::read_metadata_dir(dir, run_number) {
        Ok(metadata) => Some(metadata),
        Err(error) => {
            tracing::warn!(dir = %dir.display(), %error, "metadata directory not usable");
            warnings.push(format!("metadata not used: {error}"));
            None
        }
    }
}

/// Reader warnings come before the assembler's own.
fn prepend(warnings: &mut Vec<String>, mut front: Vec<String>) {
    front.append(warnings);
    *warnings = front;
}

fn writer_for(args: &AssembleArgs, config: &OutputConfig) -> LakeWriter {
    let mut writer = LakeWriter::from_config(config);
    if let Some(dir) = &args.output {
        writer = LakeWriter::new(dir)
            .with_parquet(config.parquet)
            .with_json(config.json);
    }
    if args.json {
        writer = writer.with_json(true);
    }
    if args.no_parquet {
        writer = writer.with_parquet(false);
    }
    writer
}

fn validate_records(result: &AssemblyResult) -> anyhow::Result<()> {
    let registry = SchemaRegistry::new().context("failed to build schema registry")?;
    registry
        .validate_value("reflectivity", &result.reflectivity)
        .context("reflectivity record does not match its schema")?;
    if let Some(sample) = &result.sample {
        registry
            .validate_value("sample", sample)
            .context("sample record does not match its schema")?;
    }
    if let Some(environment) = &result.environment {
        registry
            .validate_value("environment", environment)
            .context("environment record does not match its schema")?;
    }
    if let Some(model) = &result.model {
        registry
            .validate_value("model", model)
            .context("model record does not match its schema")?;
    }
    Ok(())
}
