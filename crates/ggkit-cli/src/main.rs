//! ggkit CLI - write, inspect and verify GGUF model containers

use anyhow::{Context, Result};
use clap::Parser;
use ggkit_cli::config::ConfigLoader;
use ggkit_cli::{commands, logging, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader
        .with_env_prefix("GGKIT")
        .load()
        .context("Failed to load configuration")?;

    logging::init_logging(&config.log, cli.verbose)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::WriteSample {
            path,
            tensors,
            seed,
            alignment,
        } => commands::write_sample::execute(&path, tensors, seed, alignment, &config, &mut out),
        Commands::Inspect { path, json, key } => {
            commands::inspect::execute(&path, json, key.as_deref(), &config, &mut out)
        }
        Commands::Verify { path } => commands::verify::execute(&path, &config, &mut out),
        Commands::Dump {
            path,
            tensor,
            limit,
        } => commands::dump::execute(&path, &tensor, limit, &config, &mut out),
    }
}
