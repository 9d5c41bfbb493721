//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// logprep - encoding cache and archive export for event logs
///
/// Encodes event logs into train/validation/test splits once per parameter
/// set and serves the results as ZIP archives.
#[derive(Parser, Debug)]
#[command(name = "logprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LOGPREP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dataset root (overrides storage.data_dir)
    #[arg(long, global = true, env = "LOGPREP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Encode a dataset and write the ZIP archive
    Encode(EncodeArgs),

    /// List available datasets
    Datasets,

    /// Show default encoding properties of a dataset
    Props(PropsArgs),

    /// Inspect cached artifacts
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address (default: server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Arguments for the encode command
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// Dataset name
    pub dataset: String,

    /// JSON file with property overrides (wire field names)
    #[arg(short, long)]
    pub properties: Option<PathBuf>,

    /// Output file (default: {dataset}.zip, "-" for stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the props command
#[derive(Parser, Debug)]
pub struct PropsArgs {
    /// Dataset name
    pub dataset: String,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached artifact sets
    List {
        /// Only this dataset
        dataset: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}
