//! logprep - Event Log Encoding Cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use logprep::cli::{Cli, Commands};
use logprep::config::{Config, ConfigManager};
use logprep::error::LogprepResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config: &Config) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("logprep=warn"),
        1 => EnvFilter::new("logprep=info"),
        _ => EnvFilter::new("logprep=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .without_time()
            .init();
    }
}

async fn run() -> LogprepResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let mut config = config_manager.load().await?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    init_logging(cli.verbose, &config);
    logprep::ui::init_theme();
    debug!("Using config {}", config_manager.path().display());

    // Dispatch to command
    match cli.command {
        Commands::Serve(args) => logprep::cli::commands::serve(args, &config).await,
        Commands::Encode(args) => logprep::cli::commands::encode(args, &config).await,
        Commands::Datasets => logprep::cli::commands::datasets(&config).await,
        Commands::Props(args) => logprep::cli::commands::props(args, &config).await,
        Commands::Cache(args) => logprep::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            logprep::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
