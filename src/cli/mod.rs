//! CLI definitions and command implementations for modelfs.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// modelfs - Inspect and move predictor / integration storage
#[derive(Parser)]
#[command(name = "modelfs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/modelfs/modelfs.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Entity kind for commands that work on both
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Predictor,
    Integration,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show status, training progress, columns and stored files of a predictor
    Info {
        /// Predictor id
        predictor: i64,
    },

    /// Bundle the files of an integration into a zip archive
    Export {
        /// Integration id
        integration: i64,

        /// Output archive path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract a zip archive into an integration folder and publish it
    Import {
        /// Integration id
        integration: i64,

        /// Archive to import
        archive: PathBuf,
    },

    /// Delete all files and JSON values of an entity (the record is kept)
    Purge {
        #[arg(value_enum)]
        kind: EntityKind,

        /// Entity id
        id: i64,
    },

    /// Show the effective configuration
    Config {
        /// Write the configuration to the config path
        #[arg(long)]
        init: bool,
    },
}
