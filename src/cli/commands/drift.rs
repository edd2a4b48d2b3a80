//! skp drift - Show which of a skill's modified files drifted

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::CommandOutcome;
use crate::cli::colors::SkpStyles;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct DriftArgs {
    /// Skill package directory
    pub skill_dir: PathBuf,
}

#[derive(Serialize)]
struct DriftReport {
    drifted: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &DriftArgs) -> Result<CommandOutcome> {
    let drifted = ctx.orchestrator()?.drift(&args.skill_dir)?;

    if ctx.robot_mode {
        emit_robot(&robot_ok(DriftReport { drifted }))?;
    } else if drifted.is_empty() {
        println!("{} No drift", SkpStyles::check());
    } else {
        let mut layout = HumanLayout::new();
        layout.section("Drifted files");
        for path in &drifted {
            layout.bullet(&SkpStyles::warning(path).to_string());
        }
        emit_human(layout);
    }
    Ok(CommandOutcome::Success)
}
