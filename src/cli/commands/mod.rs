//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod abort;
pub mod apply;
pub mod drift;
pub mod hash;
pub mod init;
pub mod resolve;
pub mod status;

use crate::app::AppContext;
use crate::error::Result;

/// How a command finished, mapped to the process exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failed,
    Conflicts,
}

impl CommandOutcome {
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::Conflicts => 2,
        }
    }
}

pub fn run(ctx: &AppContext, command: &Commands) -> Result<CommandOutcome> {
    match command {
        Commands::Init(args) => init::run(ctx, args),
        Commands::Apply(args) => apply::run(ctx, args),
        Commands::Status(args) => status::run(ctx, args),
        Commands::Drift(args) => drift::run(ctx, args),
        Commands::Resolve(args) => resolve::run(ctx, args),
        Commands::Abort(args) => abort::run(ctx, args),
        Commands::Hash(args) => hash::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the engine directory and snapshot baselines
    Init(init::InitArgs),

    /// Apply a skill package
    Apply(apply::ApplyArgs),

    /// Show applied skills, pending work and drift
    Status(status::StatusArgs),

    /// List a skill's modified files that drifted from their baselines
    Drift(drift::DriftArgs),

    /// Finish an application after fixing its conflicts by hand
    Resolve(resolve::ResolveArgs),

    /// Roll back an application left pending on conflicts
    Abort(abort::AbortArgs),

    /// Print the content hash of a file
    Hash(hash::HashArgs),
}
