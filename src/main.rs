//! buildstash - Go build cache keys for CI
//!
//! CLI entry point that dispatches to subcommands.

use buildstash::cli::{Cli, Commands};
use buildstash::config::{Config, ConfigManager};
use buildstash::error::{BuildstashError, BuildstashResult};
use clap::Parser;
use console::style;
use std::process::ExitCode;
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
        0 => EnvFilter::new("buildstash=warn"),
        1 => EnvFilter::new("buildstash=info"),
        _ => EnvFilter::new("buildstash=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

async fn run() -> BuildstashResult<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()
        .map_err(|e| BuildstashError::io("getting current directory", e))?;
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load(&cwd).await?;

    // Command line and BUILDSTASH_* variables win over the config file
    cli.inputs.apply(&mut config.cache);
    if let Some(ref go) = cli.inputs.go {
        config.toolchain.go = go.clone();
    }
    if let Some(ref dir) = cli.inputs.store_dir {
        config.provider.store_dir = Some(dir.clone());
    }
    if let Some(ref file) = cli.state_file {
        config.state.file = Some(file.clone());
    }

    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Restore => buildstash::cli::commands::restore(&config).await,
        Commands::Save(args) => buildstash::cli::commands::save(args, &config).await,
        Commands::Key(args) => buildstash::cli::commands::key(args, &config).await,
    }
}
