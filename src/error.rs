//! Error types for skp

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkpError>;

#[derive(Error, Debug)]
pub enum SkpError {
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("missing dependencies: {}", .0.join(", "))]
    DependencyUnmet(Vec<String>),

    #[error("conflicting skills: {}", .0.join(", "))]
    ConflictingSkill(Vec<String>),

    #[error("skill modified file not found: {}", .0.display())]
    MergeSourceMissing(PathBuf),

    #[error("merge conflicts in: {}", .0.join(", "))]
    ConflictsPending(Vec<String>),

    #[error("dependency conflict: {name} is already at {existing}, skill wants {requested}")]
    StructuredConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error(
        "state version {found} is newer than tooling version {supported}; update skp"
    )]
    StateVersionMismatch { found: String, supported: String },

    #[error("{} not found; run `skp init` first", .0.display())]
    NotInitialized(PathBuf),

    #[error("unfinished application of {skill}@{version}; run `skp resolve` or `skp abort`")]
    PendingApplication { skill: String, version: String },

    #[error("no pending application")]
    NoPendingApplication,

    #[error("merge driver failed: {0}")]
    MergeDriver(String),

    #[error("install step failed: {0}")]
    InstallFailed(String),

    #[error("project lock is held by another process: {0}")]
    LockBusy(String),

    #[error("backup error: {0}")]
    Backup(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl SkpError {
    /// Stable machine-readable code used in robot output.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Manifest(_) => "manifest_error",
            Self::DependencyUnmet(_) => "dependency_unmet",
            Self::ConflictingSkill(_) => "conflicting_skill",
            Self::MergeSourceMissing(_) => "merge_source_missing",
            Self::ConflictsPending(_) => "conflicts_pending",
            Self::StructuredConflict { .. } => "structured_conflict",
            Self::StateVersionMismatch { .. } => "state_version_mismatch",
            Self::NotInitialized(_) => "not_initialized",
            Self::PendingApplication { .. } => "pending_application",
            Self::NoPendingApplication => "no_pending_application",
            Self::MergeDriver(_) => "merge_driver",
            Self::InstallFailed(_) => "install_failed",
            Self::LockBusy(_) => "lock_busy",
            Self::Backup(_) => "backup_error",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
            Self::Git(_) => "git_error",
        }
    }
}

impl From<serde_yaml::Error> for SkpError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SkpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
