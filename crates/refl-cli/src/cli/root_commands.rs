use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Assemble records from a reduced file and optional metadata and model.
    Assemble(AssembleArgs),
    /// List the effective instrument profiles.
    Instruments,
    /// Print a JSON Schema, or list the available schemas.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct AssembleArgs {
    /// Reduced reflectivity text file.
    #[arg(long, value_name = "FILE")]
    pub reduced: PathBuf,

    /// Directory of Parquet metadata tables.
    #[arg(long, value_name = "DIR")]
    pub metadata: Option<PathBuf>,

    /// Fitted model JSON file.
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Co-refinement dataset index (0-based); auto-detected when omitted.
    #[arg(long, value_name = "N")]
    pub dataset_index: Option<usize>,

    /// Free-text environment description, replacing the derived one.
    #[arg(long, value_name = "TEXT")]
    pub environment_description: Option<String>,

    /// Output directory (overrides `output.directory`).
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Also write JSON copies of the records.
    #[arg(long)]
    pub json: bool,

    /// Do not write Parquet tables.
    #[arg(long)]
    pub no_parquet: bool,

    /// Assemble and validate without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Schema name, e.g. `reflectivity`. Lists names when omitted.
    pub name: Option<String>,
}
