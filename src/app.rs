use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::apply::Orchestrator;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::{Result, SkpError};
use crate::storage::{ProjectLayout, ProjectLock};

const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppContext {
    pub project_root: PathBuf,
    pub config: Config,
    pub layout: ProjectLayout,
    pub robot_mode: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let project_root = match &cli.project {
            Some(root) => root.clone(),
            None => Self::find_project_root(cli)?,
        };
        let config = Config::load(cli.config.as_deref(), &project_root)?;
        let layout = ProjectLayout::from_config(project_root.clone(), &config);

        Ok(Self {
            project_root,
            config,
            layout,
            robot_mode: cli.robot,
            verbosity: cli.verbose,
        })
    }

    /// Nearest ancestor holding the engine directory, else the current
    /// directory. The directory name honours `SKP_STATE_DIR`, the global
    /// config and `--config`.
    fn find_project_root(cli: &Cli) -> Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        let hint = Config::load(cli.config.as_deref(), &cwd)?;
        project_root_from(&cwd, &hint.paths.state_dir)
    }

    /// Serialise against other runs on the same project.
    pub fn lock(&self) -> Result<ProjectLock> {
        if !self.layout.state_dir().is_dir() {
            return Err(SkpError::NotInitialized(self.layout.state_file()));
        }
        ProjectLock::acquire_timeout(self.layout.state_dir(), LOCK_TIMEOUT)
    }

    pub fn orchestrator(&self) -> Result<Orchestrator> {
        Orchestrator::new(self.layout.clone(), self.config.clone())
    }
}

fn project_root_from(cwd: &Path, state_dir: &Path) -> Result<PathBuf> {
    // An absolute state dir cannot be searched for.
    if state_dir.is_absolute() {
        return Ok(cwd.to_path_buf());
    }
    if let Some(found) = find_upwards(cwd, state_dir)? {
        let depth = state_dir.components().count();
        if let Some(root) = found.ancestors().nth(depth) {
            return Ok(root.to_path_buf());
        }
    }
    Ok(cwd.to_path_buf())
}

fn find_upwards(start: &Path, name: &Path) -> Result<Option<PathBuf>> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(name);
        if candidate.is_dir() {
            return Ok(Some(candidate));
        }
        current = dir.parent();
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn find_upwards_walks_parents() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".skp")).unwrap();
        let nested = dir.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_upwards(&nested, Path::new(".skp")).unwrap().unwrap();
        assert_eq!(found, dir.path().join(".skp"));
    }

    #[test]
    fn project_root_uses_configured_state_dir() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".engine/state")).unwrap();
        let nested = dir.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        let root = project_root_from(&nested, Path::new(".engine/state")).unwrap();
        assert_eq!(root, dir.path());

        let fallback = project_root_from(&nested, Path::new(".skp")).unwrap();
        assert_eq!(fallback, nested);
    }
}
