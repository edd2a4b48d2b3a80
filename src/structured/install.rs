//! Post-merge package install.

use std::path::Path;
use std::process::Command;

use crate::config::InstallConfig;
use crate::error::{Result, SkpError};

/// Run the configured install command in `root`. Returns whether it ran.
pub fn run_install(config: &InstallConfig, root: &Path) -> Result<bool> {
    let Some((program, args)) = config.command.split_first() else {
        return Ok(false);
    };
    if !config.enabled {
        tracing::debug!("install step disabled");
        return Ok(false);
    }

    tracing::info!(command = %config.command.join(" "), "running install step");
    let output = Command::new(program)
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|err| SkpError::InstallFailed(format!("spawn {program}: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SkpError::InstallFailed(format!(
            "{} exited with {}: {}",
            config.command.join(" "),
            output.status,
            stderr.trim()
        )));
    }
    Ok(true)
}
