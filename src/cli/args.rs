//! CLI argument definitions using clap derive

use crate::config::CacheInputs;
use crate::provider::ProviderKind;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// buildstash - Go build cache keys for CI
///
/// Derives deterministic cache keys for the Go build and module caches,
/// restores the best match before a job and saves afterwards only when the
/// exact key was not already restored.
#[derive(Parser, Debug)]
#[command(name = "buildstash")]
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
    #[arg(short, long, global = true, env = "BUILDSTASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// File carrying state from restore to save
    #[arg(long, global = true, env = "BUILDSTASH_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Declared cache inputs
    #[command(flatten)]
    pub inputs: InputArgs,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore the cache and record whether a save is needed
    Restore,

    /// Save the cache unless the exact key was restored
    Save(SaveArgs),

    /// Print the derived cache keys without touching the cache
    Key(KeyArgs),
}

/// Arguments for the save command
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Outcome of the job so far
    #[arg(long, env = "BUILDSTASH_JOB_STATUS", default_value = "success")]
    pub job_status: JobStatus,
}

/// Arguments for the key command
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Job status as reported by the CI host
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobStatus {
    Success,
    Failure,
    Cancelled,
}

impl JobStatus {
    /// Whether the job should count as failed for `cache-on-failure`
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Output format for the key command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// `name=value` lines
    Plain,
    /// JSON document with every derived field
    Json,
}

/// Overrides for the `[cache]` section of the config file
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// Base of every key
    #[arg(long, global = true, env = "BUILDSTASH_PREFIX_KEY")]
    pub prefix_key: Option<String>,

    /// Key shared across jobs (replaces --key and the job id)
    #[arg(long, global = true, env = "BUILDSTASH_SHARED_KEY")]
    pub shared_key: Option<String>,

    /// Extra key segment placed before the job id
    #[arg(long, global = true, env = "BUILDSTASH_KEY")]
    pub key: Option<String>,

    /// Extra environment variable prefixes (whitespace-separated)
    #[arg(long, global = true, env = "BUILDSTASH_ENV_VARS")]
    pub env_vars: Option<String>,

    /// Module roots (newline-separated)
    #[arg(long, global = true, env = "BUILDSTASH_WORKSPACES")]
    pub workspaces: Option<String>,

    /// Extra directories to cache (whitespace-separated)
    #[arg(long, global = true, env = "BUILDSTASH_CACHE_DIRECTORIES")]
    pub cache_directories: Option<String>,

    /// Save even when the job failed
    #[arg(long, global = true, env = "BUILDSTASH_CACHE_ON_FAILURE",
          action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub cache_on_failure: Option<bool>,

    /// Save predicate (true/false)
    #[arg(long, global = true, env = "BUILDSTASH_SAVE_IF")]
    pub save_if: Option<String>,

    /// Check for a hit without restoring files
    #[arg(long, global = true, env = "BUILDSTASH_LOOKUP_ONLY",
          action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub lookup_only: Option<bool>,

    /// Cache backend
    #[arg(long, global = true, env = "BUILDSTASH_CACHE_PROVIDER")]
    pub cache_provider: Option<ProviderKind>,

    /// Cache the toolchain's binary install directory
    #[arg(long, global = true, env = "BUILDSTASH_CACHE_BIN",
          action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub cache_bin: Option<bool>,

    /// Go binary to query
    #[arg(long, global = true, env = "BUILDSTASH_GO")]
    pub go: Option<PathBuf>,

    /// Directory used by the local provider
    #[arg(long, global = true, env = "BUILDSTASH_STORE_DIR")]
    pub store_dir: Option<PathBuf>,
}

impl InputArgs {
    /// Overlay the given values onto inputs loaded from the config file
    pub fn apply(&self, inputs: &mut CacheInputs) {
        let strings = [
            (&self.prefix_key, &mut inputs.prefix_key),
            (&self.shared_key, &mut inputs.shared_key),
            (&self.key, &mut inputs.key),
            (&self.env_vars, &mut inputs.env_vars),
            (&self.workspaces, &mut inputs.workspaces),
            (&self.cache_directories, &mut inputs.cache_directories),
            (&self.save_if, &mut inputs.save_if),
        ];
        for (value, target) in strings {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        if let Some(value) = self.cache_on_failure {
            inputs.cache_on_failure = value;
        }
        if let Some(value) = self.lookup_only {
            inputs.lookup_only = value;
        }
        if let Some(value) = self.cache_bin {
            inputs.cache_bin = value;
        }
        if let Some(value) = self.cache_provider {
            inputs.cache_provider = value;
        }
    }
}
