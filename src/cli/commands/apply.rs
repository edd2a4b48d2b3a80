//! skp apply - Apply a skill package

use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::apply::ApplyResult;
use crate::cli::CommandOutcome;
use crate::cli::colors::SkpStyles;
use crate::cli::output::{
    HumanLayout, emit_human, emit_robot, robot_conflicts, robot_failed, robot_ok,
};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Skill package directory (holds manifest.yaml, add/, modify/)
    pub skill_dir: PathBuf,
}

pub fn run(ctx: &AppContext, args: &ApplyArgs) -> Result<CommandOutcome> {
    let lock = ctx.lock()?;
    let orchestrator = ctx.orchestrator()?;
    let result = orchestrator.apply(&lock, &args.skill_dir)?;
    report(ctx, &result)
}

/// Render an apply or resolve result and pick the exit outcome.
pub fn report(ctx: &AppContext, result: &ApplyResult) -> Result<CommandOutcome> {
    let outcome = if result.success {
        CommandOutcome::Success
    } else if result.has_conflicts() {
        CommandOutcome::Conflicts
    } else {
        CommandOutcome::Failed
    };

    if ctx.robot_mode {
        match outcome {
            CommandOutcome::Success => emit_robot(&robot_ok(result))?,
            CommandOutcome::Conflicts => emit_robot(&robot_conflicts(
                result.merge_conflicts.clone().unwrap_or_default(),
                result,
            ))?,
            CommandOutcome::Failed => emit_robot(&robot_failed(
                result.error_code.unwrap_or("error"),
                result.error.clone().unwrap_or_default(),
                result,
            ))?,
        }
        return Ok(outcome);
    }

    let name = format!("{}@{}", result.skill, result.version);
    let mut layout = HumanLayout::new();
    match outcome {
        CommandOutcome::Success => {
            layout.push_line(format!(
                "{} Applied {}",
                SkpStyles::check(),
                SkpStyles::skill(&name)
            ));
        }
        CommandOutcome::Conflicts => {
            layout.push_line(format!(
                "{} {} left merge conflicts",
                SkpStyles::exclaim(),
                SkpStyles::skill(&name)
            ));
            for path in result.merge_conflicts.iter().flatten() {
                layout.bullet(&SkpStyles::path(path).to_string());
            }
            layout.blank().push_line(format!(
                "Fix the files, then run {} (or {} to roll back).",
                SkpStyles::command("skp resolve"),
                SkpStyles::command("skp abort")
            ));
        }
        CommandOutcome::Failed => {
            layout.push_line(format!(
                "{} {} not applied: {}",
                SkpStyles::cross(),
                SkpStyles::skill(&name),
                SkpStyles::error(result.error.as_deref().unwrap_or("unknown error"))
            ));
        }
    }

    if !result.auto_resolved.is_empty() {
        layout.blank().section("Replayed resolutions");
        for path in &result.auto_resolved {
            layout.bullet(path);
        }
    }
    if !result.drift.is_empty() {
        layout.blank().section("Drifted files (merged three-way)");
        for path in &result.drift {
            layout.bullet(&SkpStyles::muted(path).to_string());
        }
    }
    if let Some(structured) = &result.structured {
        if !structured.dependencies_added.is_empty() {
            layout.blank().section("Dependencies added");
            for (dep, version) in &structured.dependencies_added {
                layout.bullet(&format!("{dep} {version}"));
            }
        }
        if !structured.env_added.is_empty() {
            layout.blank().section("Environment variables added");
            for var in &structured.env_added {
                layout.bullet(var);
            }
        }
    }
    emit_human(layout);
    Ok(outcome)
}
