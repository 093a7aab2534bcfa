//! modelfs CLI - Inspect predictor storage, export/import integration files.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli::commands::load_config(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("modelfs={}", log_level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Info { predictor } => cli::commands::info(&config, predictor)?,
        Commands::Export {
            integration,
            output,
        } => cli::commands::export(&config, integration, &output)?,
        Commands::Import {
            integration,
            archive,
        } => cli::commands::import(&config, integration, &archive)?,
        Commands::Purge { kind, id } => cli::commands::purge(&config, kind, id)?,
        Commands::Config { init } => cli::commands::show_config(&config, cli.config, init)?,
    }

    Ok(())
}
