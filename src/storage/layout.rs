//! On-disk layout of the engine directory inside a project.

use std::path::{Path, PathBuf};

use crate::config::Config;

pub const STATE_FILE: &str = "state.yaml";
pub const BASE_DIR: &str = "base";
pub const BACKUP_DIR: &str = "backup";
pub const BACKUP_INDEX: &str = "backup.yaml";
pub const PENDING_FILE: &str = "pending.yaml";
pub const RR_CACHE_DIR: &str = "rr-cache";
pub const LOCK_FILE: &str = "skp.lock";

/// Resolved paths for one project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
    state_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, state_dir: impl AsRef<Path>) -> Self {
        let root = root.into();
        let state_dir = root.join(state_dir);
        Self { root, state_dir }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &Config) -> Self {
        Self::new(root, &config.paths.state_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    pub fn base_dir(&self) -> PathBuf {
        self.state_dir.join(BASE_DIR)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.state_dir.join(BACKUP_DIR)
    }

    pub fn backup_index(&self) -> PathBuf {
        self.state_dir.join(BACKUP_INDEX)
    }

    pub fn pending_file(&self) -> PathBuf {
        self.state_dir.join(PENDING_FILE)
    }

    pub fn local_rr_cache(&self) -> PathBuf {
        self.state_dir.join(RR_CACHE_DIR)
    }

    /// Live project file for a relative path.
    pub fn live(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Baseline snapshot for a relative path.
    pub fn baseline(&self, rel: &str) -> PathBuf {
        self.base_dir().join(rel)
    }
}
