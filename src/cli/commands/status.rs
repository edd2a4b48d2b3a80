//! skp status - Applied skills, pending work and drift

use clap::Args;

use crate::app::AppContext;
use crate::apply::TrackedChange;
use crate::cli::CommandOutcome;
use crate::cli::colors::SkpStyles;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub fn run(ctx: &AppContext, _args: &StatusArgs) -> Result<CommandOutcome> {
    let status = ctx.orchestrator()?.status()?;

    if ctx.robot_mode {
        emit_robot(&robot_ok(&status))?;
        return Ok(CommandOutcome::Success);
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Skill engine status")
        .kv("Schema", &status.skills_system_version)
        .kv("Core version", &status.core_version)
        .blank()
        .section("Applied skills");
    if status.applied.is_empty() {
        layout.push_line(SkpStyles::muted("(none)").to_string());
    }
    for skill in &status.applied {
        layout.bullet(&format!(
            "{} {}",
            SkpStyles::skill(format!("{}@{}", skill.name, skill.version)),
            SkpStyles::muted(format!(
                "{} files, {}",
                skill.files,
                skill.applied_at.format("%Y-%m-%d %H:%M UTC")
            ))
        ));
    }

    if let Some(pending) = &status.pending {
        layout.blank().section("Pending application");
        layout.push_line(format!(
            "{} {}@{} has unresolved conflicts:",
            SkpStyles::exclaim(),
            pending.skill,
            pending.version
        ));
        for path in &pending.conflicts {
            layout.bullet(&SkpStyles::path(path).to_string());
        }
    } else if status.stale_backup {
        layout.blank().push_line(format!(
            "{} A backup from an interrupted run is present; run {}",
            SkpStyles::exclaim(),
            SkpStyles::command("skp abort")
        ));
    }

    if !status.drift.is_empty() {
        layout.blank().section("Changed since applied");
        for entry in &status.drift {
            let change = match entry.change {
                TrackedChange::Modified => "modified",
                TrackedChange::Missing => "missing",
            };
            layout.bullet(&format!(
                "{} {} ({})",
                SkpStyles::warning(change),
                entry.path,
                SkpStyles::muted(&entry.skill)
            ));
        }
    }

    emit_human(layout);
    Ok(CommandOutcome::Success)
}
