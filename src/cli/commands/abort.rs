//! skp abort - Roll back a pending application

use clap::Args;

use crate::app::AppContext;
use crate::cli::CommandOutcome;
use crate::cli::colors::SkpStyles;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct AbortArgs {}

pub fn run(ctx: &AppContext, _args: &AbortArgs) -> Result<CommandOutcome> {
    let lock = ctx.lock()?;
    let report = ctx.orchestrator()?.abort(&lock)?;

    if ctx.robot_mode {
        emit_robot(&robot_ok(&report))?;
    } else {
        let what = match (&report.skill, &report.version) {
            (Some(skill), Some(version)) => format!("{skill}@{version}"),
            _ => "interrupted run".to_string(),
        };
        let mut layout = HumanLayout::new();
        layout
            .push_line(format!("{} Rolled back {}", SkpStyles::check(), SkpStyles::skill(what)))
            .kv("Restored", &report.restored.to_string())
            .kv("Removed", &report.removed.to_string());
        emit_human(layout);
    }
    Ok(CommandOutcome::Success)
}
