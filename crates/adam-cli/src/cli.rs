//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use adam_model::OutputFormat;

#[derive(Parser)]
#[command(
    name = "adam-cli",
    version,
    about = "Derive DS and ADSL datasets with best-evidence dates",
    long_about = "Derive disposition (DS) and subject-level (ADSL) datasets from a \
                  study folder of CSV files.\n\n\
                  Last-known-alive dates are resolved from vital signs, adverse \
                  events, disposition and exposure records. Outputs are written \
                  as CSV and SAS Transport (XPT) files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include subject identifiers in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Derive DS, ADSL and the AE summary for a study folder.
    Study(StudyArgs),

    /// Answer a free-text question about adverse events.
    Query(QueryArgs),

    /// List the last-known-alive evidence sources in tie-break order.
    Sources(SourcesArgs),
}

#[derive(Parser)]
pub struct StudyArgs {
    /// Path to the study data folder containing CSV files.
    #[arg(value_name = "STUDY_FOLDER")]
    pub study_folder: PathBuf,

    /// Output directory for generated files (default: <STUDY_FOLDER>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Derivation options file (TOML).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format to generate (overrides the config file).
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormatArg>,

    /// Derive and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct QueryArgs {
    /// ADAE CSV file, or a study folder containing adae.csv.
    #[arg(value_name = "ADAE")]
    pub adae: PathBuf,

    /// Question, e.g. "How many subjects had severe headache?"
    #[arg(value_name = "QUESTION")]
    pub question: String,
}

#[derive(Parser)]
pub struct SourcesArgs {
    /// Derivation options file (TOML).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Csv,
    Xpt,
    Both,
}

impl OutputFormatArg {
    pub fn formats(self) -> Vec<OutputFormat> {
        match self {
            Self::Csv => vec![OutputFormat::Csv],
            Self::Xpt => vec![OutputFormat::Xpt],
            Self::Both => vec![OutputFormat::Csv, OutputFormat::Xpt],
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
