//! One-time project initialisation.
//!
//! Creates the engine directory, snapshots the configured roots into the
//! baseline tree and writes an empty state.

use std::fs;

use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::storage::layout::ProjectLayout;
use crate::storage::state::StateStore;
use crate::utils::{copy_tree, ensure_dir};

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InitReport {
    pub core_version: String,
    pub snapshotted: Vec<String>,
    pub git_workspace: bool,
}

pub fn init_project(layout: &ProjectLayout, config: &Config) -> Result<InitReport> {
    ensure_dir(layout.state_dir())?;

    let base = layout.base_dir();
    let mut snapshotted = Vec::new();
    for root in &config.init.snapshot_roots {
        let target = base.join(root);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        let copied = copy_tree(&layout.live(root), &target, |name| {
            config.init.exclude.iter().any(|excluded| excluded == name)
        })?;
        snapshotted.extend(copied.into_iter().map(|rel| format!("{root}/{rel}")));
    }

    let core_version = read_core_version(layout, config);
    StateStore::new(layout.state_file()).initialize(&core_version)?;

    let git_workspace = git2::Repository::discover(layout.root()).is_ok();
    tracing::info!(
        files = snapshotted.len(),
        core_version = %core_version,
        git_workspace,
        "initialized skill engine"
    );

    Ok(InitReport {
        core_version,
        snapshotted,
        git_workspace,
    })
}

/// Project version from the dependency manifest, `0.0.0` when unknown.
fn read_core_version(layout: &ProjectLayout, config: &Config) -> String {
    let path = layout.root().join(&config.paths.dependency_manifest);
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        .and_then(|value| value.get("version").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "0.0.0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_snapshots_and_writes_state() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/skills-engine")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "export {}\n").unwrap();
        fs::write(dir.path().join("src/skills-engine/apply.ts"), "x").unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"p","version":"1.4.0"}"#).unwrap();

        let mut config = Config::default();
        config.init.exclude.push("skills-engine".to_string());
        let layout = ProjectLayout::from_config(dir.path(), &config);

        let report = init_project(&layout, &config).unwrap();
        assert_eq!(report.core_version, "1.4.0");
        assert_eq!(report.snapshotted, vec!["src/index.ts"]);
        assert!(layout.baseline("src/index.ts").exists());
        assert!(!layout.baseline("src/skills-engine/apply.ts").exists());

        let state = StateStore::new(layout.state_file()).read().unwrap();
        assert_eq!(state.core_version, "1.4.0");
        assert!(state.applied_skills.is_empty());
    }

    #[test]
    fn init_without_manifest_defaults_version() {
        let dir = tempdir().unwrap();
        let config = Config::default();
        let layout = ProjectLayout::from_config(dir.path(), &config);
        let report = init_project(&layout, &config).unwrap();
        assert_eq!(report.core_version, "0.0.0");
        assert!(report.snapshotted.is_empty());
    }
}
