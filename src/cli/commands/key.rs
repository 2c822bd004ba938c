//! Key command - print the derived keys

use crate::cli::args::{KeyArgs, OutputFormat};
use crate::cli::commands::build_cache_config;
use crate::config::Config;
use crate::error::BuildstashResult;

/// Execute the key command
pub async fn execute(args: KeyArgs, config: &Config) -> BuildstashResult<()> {
    let cache_config = build_cache_config(config).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cache_config)?),
        OutputFormat::Plain => {
            println!("key={}", cache_config.key);
            println!("restore-key={}", cache_config.restore_key);
            for path in &cache_config.paths {
                println!("path={}", path.display());
            }
        }
    }

    Ok(())
}
