//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

pub mod colors;
pub mod commands;
pub mod output;

pub use commands::{CommandOutcome, Commands};

#[derive(Parser, Debug)]
#[command(name = "skp", version, about = "Apply skill packages to a project, transactionally")]
pub struct Cli {
    /// Machine-readable JSON output on stdout
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this config file instead of the global and project files
    #[arg(long, global = true, env = "SKP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the nearest directory holding the engine
    /// directory, else the current directory)
    #[arg(long, global = true, env = "SKP_PROJECT")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
