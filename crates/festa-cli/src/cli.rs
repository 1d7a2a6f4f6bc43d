//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Festa - turn photography contest announcements into records and score photos against them.
#[derive(Debug, Parser)]
#[command(name = "festa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file path
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Use the built-in deterministic provider instead of Gemini
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract a contest record from a PDF, images, or text
    Extract(ExtractArgs),

    /// Research a contest and save the analysis photos are judged against
    Context(ContextArgs),

    /// Score photos against a contest
    Analyze(AnalyzeArgs),

    /// Remove one photo from a record's latest analysis
    RemovePhoto(RemovePhotoArgs),

    /// List saved records
    List(ListArgs),

    /// Show one record
    Show(ShowArgs),

    /// Delete records
    Delete(DeleteArgs),

    /// Write every record to a JSON backup
    Export(ExportArgs),

    /// Load records from a JSON backup
    Import(ImportArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// One PDF, or up to ten JPEG/PNG images in reading order
    #[arg(required_unless_present_any = ["text", "stdin"])]
    pub files: Vec<PathBuf>,

    /// Announcement text
    #[arg(short, long, conflicts_with_all = ["files", "stdin"])]
    pub text: Option<String>,

    /// Read announcement text from stdin
    #[arg(long, conflicts_with = "files")]
    pub stdin: bool,

    /// Continue past quality warnings and accept the deadline without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the context command.
#[derive(Debug, Parser)]
pub struct ContextArgs {
    /// Record ID or unique prefix
    pub id: String,

    /// Extra notes for the research (style, sections, anything known)
    #[arg(short, long)]
    pub notes: Option<String>,
}

/// Arguments for the analyze command.
#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Record ID or unique prefix
    pub id: String,

    /// Photos to score, in order
    #[arg(required = true)]
    pub photos: Vec<PathBuf>,

    /// Score against one topic instead of the contest as a whole
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Note for one photo, as FILE=TEXT
    #[arg(short, long = "note", value_name = "FILE=TEXT")]
    pub notes: Vec<String>,
}

/// Arguments for the remove-photo command.
#[derive(Debug, Parser)]
pub struct RemovePhotoArgs {
    /// Record ID or unique prefix
    pub id: String,

    /// Photo number as shown in the "#" column
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub number: u32,
}

/// Arguments for the list command.
#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Only records whose name contains this text
    #[arg(short, long)]
    pub name: Option<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Record ID or unique prefix
    pub id: String,

    /// Also print the extracted text
    #[arg(long)]
    pub raw: bool,
}

/// Arguments for the delete command.
#[derive(Debug, Parser)]
pub struct DeleteArgs {
    /// Record IDs or unique prefixes
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the export command.
#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the import command.
#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Backup file produced by export
    pub file: PathBuf,

    /// Keep existing records instead of replacing them all
    #[arg(long)]
    pub merge: bool,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
