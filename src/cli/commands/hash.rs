//! skp hash - Content hash of a file

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::CommandOutcome;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;
use crate::utils::hash_file;

#[derive(Args, Debug)]
pub struct HashArgs {
    /// File to hash
    pub file: PathBuf,
}

#[derive(Serialize)]
struct HashReport {
    path: String,
    sha256: String,
}

pub fn run(ctx: &AppContext, args: &HashArgs) -> Result<CommandOutcome> {
    let sha256 = hash_file(&args.file)?;
    if ctx.robot_mode {
        emit_robot(&robot_ok(HashReport {
            path: args.file.display().to_string(),
            sha256,
        }))?;
    } else {
        println!("{sha256}  {}", args.file.display());
    }
    Ok(CommandOutcome::Success)
}
