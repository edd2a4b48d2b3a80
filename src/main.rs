//! skp - Skill Patch CLI
//!
//! Apply skill packages onto a project with three-way merge and rollback.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use skp::Result;
use skp::app::AppContext;
use skp::cli::colors::ColorSupport;
use skp::cli::{Cli, CommandOutcome};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    ColorSupport::detect().apply();

    match run(&cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            if cli.robot {
                // Robot mode: JSON error output to stdout
                let error_json = serde_json::json!({
                    "error": true,
                    "code": e.code(),
                    "message": e.to_string(),
                });
                println!("{}", serde_json::to_string(&error_json).unwrap_or_default());
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(CommandOutcome::Failed.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<CommandOutcome> {
    let ctx = AppContext::from_cli(cli)?;
    skp::cli::commands::run(&ctx, &cli.command)
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,skp=info",
        1 => "info,skp=debug",
        2 => "debug,skp=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        // JSON logging for robot mode
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
