//! skp init - Initialize the skill engine in a project

use clap::Args;

use crate::app::AppContext;
use crate::cli::CommandOutcome;
use crate::cli::colors::SkpStyles;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_failed, robot_ok};
use crate::error::{Result, SkpError};
use crate::storage::{ProjectLock, StateStore, init_project};
use crate::utils::ensure_dir;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-snapshot baselines and reset state even if already initialized
    #[arg(long, short)]
    pub force: bool,
}

pub fn run(ctx: &AppContext, args: &InitArgs) -> Result<CommandOutcome> {
    let store = StateStore::new(ctx.layout.state_file());
    if store.exists() && !args.force {
        let err = SkpError::Config(format!(
            "already initialized at {}; use --force to reset",
            ctx.layout.state_dir().display()
        ));
        if ctx.robot_mode {
            emit_robot(&robot_failed("already_initialized", err.to_string(), ()))?;
            return Ok(CommandOutcome::Failed);
        }
        return Err(err);
    }

    ensure_dir(ctx.layout.state_dir())?;
    let _lock = ProjectLock::acquire(ctx.layout.state_dir())?;
    let report = init_project(&ctx.layout, &ctx.config)?;

    if ctx.robot_mode {
        emit_robot(&robot_ok(&report))?;
    } else {
        let mut layout = HumanLayout::new();
        layout
            .title(&format!("{} Initialized skill engine", SkpStyles::check()))
            .kv("Project", &ctx.project_root.display().to_string())
            .kv("Core version", &report.core_version)
            .kv("Baselines", &report.snapshotted.len().to_string())
            .kv(
                "Resolution cache",
                if report.git_workspace { "git workspace" } else { "engine directory" },
            );
        emit_human(layout);
    }
    Ok(CommandOutcome::Success)
}
