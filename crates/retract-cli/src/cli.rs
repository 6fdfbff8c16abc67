//! CLI argument definitions for the CDR retraction toolkit.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use retract_model::RetractionScope;

#[derive(Parser)]
#[command(
    name = "cdr-retract",
    version,
    about = "CDR Retraction Toolkit - remove participant data across warehouse datasets and site submission files",
    long_about = "Remove every dependent row for a set of participant ids across a \
                  multi-site OMOP repository.\n\n\
                  Warehouse retraction emits reviewable SQL scripts (sandbox copy \
                  before every delete) from a catalog snapshot; file retraction \
                  rewrites site submission CSVs in place."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
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

    /// Allow participant identifiers in log output (PII; off by default).
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Retraction configuration JSON overriding the built-in OMOP defaults.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan pid retraction across warehouse datasets and emit SQL scripts.
    Warehouse(WarehouseArgs),

    /// Sweep a project for post-deactivation records and emit
    /// sandbox/delete pairs.
    Deactivated(DeactivatedArgs),

    /// Filter retracted pids out of site submission files in a bucket.
    Files(FilesArgs),

    /// List the table taxonomy driving retraction.
    Tables,
}

#[derive(Parser)]
#[command(group(ArgGroup::new("pid_source").required(true).args(["pid_table", "pids"])))]
pub struct WarehouseArgs {
    /// Project owning the datasets to retract from.
    #[arg(short = 'p', long = "project")]
    pub project: String,

    /// Warehouse inventory snapshot (datasets, tables, columns) as JSON.
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalog: PathBuf,

    /// Project owning the pid table (defaults to --project).
    #[arg(long = "pid-project")]
    pub pid_project: Option<String>,

    /// Sandbox dataset: holds the pid table and receives sandbox copies.
    #[arg(short = 's', long = "sandbox-dataset")]
    pub sandbox_dataset: String,

    /// Table in the sandbox dataset listing the pids to retract
    /// (schema: person_id INTEGER REQUIRED, research_id INTEGER NULLABLE).
    #[arg(short = 't', long = "pid-table")]
    pub pid_table: Option<String>,

    /// Literal pid list, comma separated (alternative to --pid-table).
    #[arg(long = "pids", value_delimiter = ',', num_args = 1..)]
    pub pids: Option<Vec<i64>>,

    /// Site whose prefixed staging tables are in scope for EHR datasets.
    #[arg(short = 'i', long = "hpo-id")]
    pub hpo_id: String,

    /// Datasets to retract from (repeatable; defaults to every dataset in
    /// the catalog).
    #[arg(short = 'd', long = "dataset")]
    pub datasets: Vec<String>,

    /// Whether registry-sourced rows are in scope or only EHR submissions.
    #[arg(short = 'r', long = "scope", value_enum)]
    pub scope: ScopeArg,

    /// Prefix for sandbox table names.
    #[arg(long = "sandbox-prefix", default_value = "retract")]
    pub sandbox_prefix: String,

    /// Directory receiving the per-dataset SQL scripts and the plan report.
    #[arg(short = 'o', long = "output-dir", default_value = "retraction_output")]
    pub output_dir: PathBuf,

    /// Print the plan summary without writing scripts or reports.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct DeactivatedArgs {
    /// Project to sweep.
    #[arg(short = 'p', long = "project")]
    pub project: String,

    /// Warehouse inventory snapshot (datasets, tables, columns) as JSON.
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalog: PathBuf,

    /// Deactivation roster CSV
    /// (header: person_id,research_id,deactivated_date).
    #[arg(long = "roster", value_name = "PATH")]
    pub roster: PathBuf,

    /// Ticket identifier prefixed onto sandbox table names.
    #[arg(long = "ticket")]
    pub ticket: String,

    /// Sandbox dataset receiving the pre-delete copies.
    #[arg(short = 's', long = "sandbox-dataset")]
    pub sandbox_dataset: String,

    /// Restrict the sweep to these datasets (default: every dataset).
    #[arg(short = 'd', long = "dataset")]
    pub datasets: Vec<String>,

    /// Directory receiving the SQL script and the plan report.
    #[arg(short = 'o', long = "output-dir", default_value = "retraction_output")]
    pub output_dir: PathBuf,

    /// Print the plan summary without writing scripts or reports.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
#[command(group(ArgGroup::new("pid_source").required(true).args(["pid_file", "pids"])))]
pub struct FilesArgs {
    /// Site whose submission bucket is retracted.
    #[arg(short = 'i', long = "hpo-id")]
    pub hpo_id: String,

    /// Bucket directory (default: BUCKET_NAME_<HPO_ID>, then
    /// DRC_BUCKET_NAME).
    #[arg(long = "bucket", value_name = "DIR")]
    pub bucket: Option<String>,

    /// Submission folder to process: a folder name, "all_folders", or
    /// "none".
    #[arg(short = 'n', long = "folder")]
    pub folder: String,

    /// Skip the per-folder and per-file Y/n confirmation prompts.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// File listing one pid per line.
    #[arg(long = "pid-file", value_name = "PATH")]
    pub pid_file: Option<PathBuf>,

    /// Literal pid list, comma separated (alternative to --pid-file).
    #[arg(long = "pids", value_delimiter = ',', num_args = 1..)]
    pub pids: Option<Vec<i64>>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    RdrAndEhr,
    OnlyEhr,
}

impl From<ScopeArg> for RetractionScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::RdrAndEhr => Self::RdrAndEhr,
            ScopeArg::OnlyEhr => Self::OnlyEhr,
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
