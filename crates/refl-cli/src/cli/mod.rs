use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::{AssembleArgs, Commands, SchemaArgs};

/// Top-level CLI parser for the `reflasm` binary.
#[derive(Debug, Parser)]
#[command(
    name = "reflasm",
    version,
    about = "Assemble reflectivity, sample, environment and model records"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["reflasm", "--format", "table", "--verbose", "instruments"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Instruments));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["reflasm", "schema", "--format", "raw", "--quiet"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Schema(ref args) if args.name.is_none()));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["reflasm", "--format", "xml", "instruments"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn assemble_parses_all_options() {
        let cli = Cli::try_parse_from([
            "reflasm",
            "assemble",
            "--reduced",
            "REF_L_218386.txt",
            "--metadata",
            "meta",
            "--model",
            "model.json",
            "--dataset-index",
            "2",
            "--environment-description",
            "in D2O",
            "-o",
            "out",
            "--json",
            "--no-parquet",
            "--dry-run",
        ])
        .expect("cli should parse");

        let Commands::Assemble(args) = cli.command else {
            panic!("expected assemble");
        };
        assert_eq!(args.reduced, PathBuf::from("REF_L_218386.txt"));
        assert_eq!(args.metadata, Some(PathBuf::from("meta")));
        assert_eq!(args.model, Some(PathBuf::from("model.json")));
        assert_eq!(args.dataset_index, Some(2));
        assert_eq!(args.environment_description.as_deref(), Some("in D2O"));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(args.json && args.no_parquet && args.dry_run);
    }

    #[test]
    fn assemble_requires_reduced_file() {
        assert!(Cli::try_parse_from(["reflasm", "assemble", "--model", "m.json"]).is_err());
    }
}
