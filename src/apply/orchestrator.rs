//! Transactional skill application.
//!
//! One run walks the phases of [`ApplyPhase`]. Nothing is written before
//! `CapturingBackup`; any error after it restores the backup before it is
//! returned. Unresolved merge conflicts are the one exception: the merged
//! output and the backup stay on disk and a pending record is written so the
//! run can be finished with [`Orchestrator::resolve`] or undone with
//! [`Orchestrator::abort`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::apply::drift::{TrackedDrift, detect_drift, tracked_drift};
use crate::config::Config;
use crate::error::{Result, SkpError};
use crate::merge::{
    FileMerger, MergeDriver, MergeReport, ResolutionCache, driver_from_config,
    has_conflict_markers,
};
use crate::skill::{SkillManifest, check_conflicts, check_dependencies};
use crate::storage::{
    BackupManager, PendingApplication, ProjectLayout, ProjectLock, StateStore, StructuredOutcome,
};
use crate::structured::StructuredMerger;
use crate::utils::{copy_file, copy_tree, hash_file, to_slash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyPhase {
    Validating,
    CheckingPreconditions,
    CapturingBackup,
    CopyingAdds,
    Merging,
    ConflictsPending,
    StructuredMerging,
    CommittingState,
    RefreshingBaselines,
    ClearingBackup,
    Succeeded,
    RestoringBackup,
    Failed,
}

impl ApplyPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::CheckingPreconditions => "checking_preconditions",
            Self::CapturingBackup => "capturing_backup",
            Self::CopyingAdds => "copying_adds",
            Self::Merging => "merging",
            Self::ConflictsPending => "conflicts_pending",
            Self::StructuredMerging => "structured_merging",
            Self::CommittingState => "committing_state",
            Self::RefreshingBaselines => "refreshing_baselines",
            Self::ClearingBackup => "clearing_backup",
            Self::Succeeded => "succeeded",
            Self::RestoringBackup => "restoring_backup",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome handed back to callers for every run that got past manifest
/// validation.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub success: bool,
    pub skill: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_conflicts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drift: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auto_resolved: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredOutcome>,
}

impl ApplyResult {
    fn new(manifest: &SkillManifest) -> Self {
        Self {
            success: false,
            skill: manifest.skill.clone(),
            version: manifest.version.clone(),
            merge_conflicts: None,
            error: None,
            error_code: None,
            drift: Vec::new(),
            auto_resolved: Vec::new(),
            structured: None,
        }
    }

    fn failed(manifest: &SkillManifest, err: &SkpError) -> Self {
        let mut result = Self::new(manifest);
        result.error = Some(err.to_string());
        result.error_code = Some(err.code());
        result
    }

    /// True when the run stopped on conflicts awaiting manual resolution.
    pub fn has_conflicts(&self) -> bool {
        self.merge_conflicts.as_ref().is_some_and(|paths| !paths.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AbortReport {
    pub skill: Option<String>,
    pub version: Option<String>,
    pub restored: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedEntry {
    pub name: String,
    pub version: String,
    pub applied_at: DateTime<Utc>,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub skills_system_version: String,
    pub core_version: String,
    pub applied: Vec<AppliedEntry>,
    pub pending: Option<PendingApplication>,
    pub stale_backup: bool,
    pub drift: Vec<TrackedDrift>,
}

pub struct Orchestrator {
    layout: ProjectLayout,
    config: Config,
    driver: Box<dyn MergeDriver>,
}

impl Orchestrator {
    /// Build with the merge driver selected in `config`.
    pub fn new(layout: ProjectLayout, config: Config) -> Result<Self> {
        let driver = driver_from_config(&config.merge)?;
        Ok(Self::with_driver(layout, config, driver))
    }

    pub fn with_driver(layout: ProjectLayout, config: Config, driver: Box<dyn MergeDriver>) -> Self {
        Self {
            layout,
            config,
            driver,
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    fn state_store(&self) -> StateStore {
        StateStore::new(self.layout.state_file())
    }

    fn backup(&self) -> BackupManager {
        BackupManager::new(&self.layout)
    }

    fn resolution_cache(&self) -> Option<ResolutionCache> {
        self.config
            .merge
            .resolution_cache
            .then(|| ResolutionCache::for_project(&self.layout))
    }

    /// Apply one skill package.
    ///
    /// Manifest and state errors are returned as `Err` before anything is
    /// touched. Failed preconditions come back as an unsuccessful
    /// [`ApplyResult`]. Errors after the backup is captured roll back and are
    /// returned as `Err`.
    pub fn apply(&self, _lock: &ProjectLock, skill_dir: &Path) -> Result<ApplyResult> {
        let skill_dir = skill_dir
            .canonicalize()
            .map_err(|err| SkpError::Manifest(format!("skill dir {}: {err}", skill_dir.display())))?;

        let mut phase = PhaseLog::new();
        phase.enter(ApplyPhase::Validating);
        let manifest = SkillManifest::load(&skill_dir)?;
        phase.skill = manifest.skill.clone();
        let state = self.state_store().read()?;

        phase.enter(ApplyPhase::CheckingPreconditions);
        if let Some(err) = self.check_preconditions(&manifest)? {
            tracing::warn!(skill = %manifest.skill, error = %err, "skill not applied");
            return Ok(ApplyResult::failed(&manifest, &err));
        }
        if !manifest.supports_core(&state.core_version) {
            tracing::warn!(
                skill = %manifest.skill,
                required = %manifest.core_version,
                core_version = %state.core_version,
                "skill targets a different core version"
            );
        }
        let drift = detect_drift(&self.layout, &manifest.modifies)?;

        let backup = self.backup();
        let cache = self.resolution_cache();
        let mut result = self.transaction(&backup, &mut phase, |phase| {
            phase.enter(ApplyPhase::CapturingBackup);
            let targets = self.backup_targets(&manifest, &skill_dir);
            backup.capture(&targets)?;

            phase.enter(ApplyPhase::CopyingAdds);
            let copied = copy_tree(&SkillManifest::add_dir(&skill_dir), self.layout.root(), |_| false)?;
            tracing::debug!(files = copied.len(), "copied added files");

            phase.enter(ApplyPhase::Merging);
            let merger = FileMerger::new(&self.layout, self.driver.as_ref(), cache.as_ref());
            let report = merger.merge_all(&skill_dir, &manifest.modifies)?;

            if report.has_conflicts() {
                phase.enter(ApplyPhase::ConflictsPending);
                return self.record_pending(&manifest, &skill_dir, report);
            }

            let mut result = self.finish(phase, &manifest, &backup)?;
            result.auto_resolved = report.auto_resolved;
            Ok(result)
        })?;
        result.drift = drift;
        Ok(result)
    }

    /// Finish an application that stopped on conflicts, once every
    /// conflicted file has been edited by hand.
    pub fn resolve(&self, _lock: &ProjectLock) -> Result<ApplyResult> {
        let pending = PendingApplication::load(&self.layout.pending_file())?
            .ok_or(SkpError::NoPendingApplication)?;
        let manifest = SkillManifest::load(&pending.skill_dir)?;

        let mut still_marked = Vec::new();
        for rel in &pending.conflicts {
            let live = self.layout.live(rel);
            if !live.is_file() || has_conflict_markers(&fs::read(&live)?) {
                still_marked.push(rel.clone());
            }
        }
        if !still_marked.is_empty() {
            return Err(SkpError::ConflictsPending(still_marked));
        }

        if let Some(cache) = self.resolution_cache() {
            for (rel, key) in &pending.resolution_keys {
                cache.record_resolution(key, &fs::read(self.layout.live(rel))?)?;
                tracing::info!(path = rel.as_str(), "recorded conflict resolution");
            }
        }

        let backup = self.backup();
        let mut phase = PhaseLog::new();
        phase.skill = manifest.skill.clone();
        let outcome = self.transaction(&backup, &mut phase, |phase| {
            self.finish(phase, &manifest, &backup)
        });
        if outcome.is_ok() || !backup.has_pending() {
            PendingApplication::remove(&self.layout.pending_file())?;
        }
        outcome
    }

    /// Roll back an application left pending on conflicts, or a backup left
    /// behind by an interrupted run.
    pub fn abort(&self, _lock: &ProjectLock) -> Result<AbortReport> {
        let pending_file = self.layout.pending_file();
        let pending = PendingApplication::load(&pending_file)?;
        let backup = self.backup();
        if pending.is_none() && !backup.has_pending() {
            return Err(SkpError::NoPendingApplication);
        }

        let mut report = AbortReport {
            skill: pending.as_ref().map(|p| p.skill.clone()),
            version: pending.as_ref().map(|p| p.version.clone()),
            restored: 0,
            removed: 0,
        };

        if backup.has_pending() {
            let index = backup.read_index()?;
            backup.restore()?;
            backup.clear()?;
            report.restored = index.captured.len();
            report.removed = index.absent.len();
        }

        if let Some(pending) = &pending {
            if let Some(cache) = self.resolution_cache() {
                for key in pending.resolution_keys.values() {
                    cache.forget(key)?;
                }
            }
        }
        PendingApplication::remove(&pending_file)?;

        tracing::info!(skill = ?report.skill, restored = report.restored, "application aborted");
        Ok(report)
    }

    pub fn status(&self) -> Result<StatusReport> {
        let state = self.state_store().read()?;
        let pending = PendingApplication::load(&self.layout.pending_file())?;
        let stale_backup = pending.is_none() && self.backup().has_pending();
        let drift = tracked_drift(&self.layout, &state)?;

        Ok(StatusReport {
            applied: state
                .applied_skills
                .iter()
                .map(|skill| AppliedEntry {
                    name: skill.name.clone(),
                    version: skill.version.clone(),
                    applied_at: skill.applied_at,
                    files: skill.file_hashes.len(),
                })
                .collect(),
            skills_system_version: state.skills_system_version,
            core_version: state.core_version,
            pending,
            stale_backup,
            drift,
        })
    }

    /// Modified paths of a skill that drifted from their baselines.
    pub fn drift(&self, skill_dir: &Path) -> Result<Vec<String>> {
        let manifest = SkillManifest::load(skill_dir)?;
        detect_drift(&self.layout, &manifest.modifies)
    }

    fn check_preconditions(&self, manifest: &SkillManifest) -> Result<Option<SkpError>> {
        if let Some(pending) = PendingApplication::load(&self.layout.pending_file())? {
            return Ok(Some(SkpError::PendingApplication {
                skill: pending.skill,
                version: pending.version,
            }));
        }
        if self.backup().has_pending() {
            return Ok(Some(SkpError::Backup(
                "a backup from an interrupted run is still present; run `skp abort`".to_string(),
            )));
        }

        let applied = self.state_store().list_applied()?;

        let deps = check_dependencies(manifest, &applied);
        if !deps.ok {
            return Ok(Some(SkpError::DependencyUnmet(deps.names)));
        }
        let conflicts = check_conflicts(manifest, &applied);
        if !conflicts.ok {
            return Ok(Some(SkpError::ConflictingSkill(conflicts.names)));
        }
        Ok(None)
    }

    /// Run `body`; on error restore the backup, clear it, and re-raise.
    fn transaction<T>(
        &self,
        backup: &BackupManager,
        phase: &mut PhaseLog,
        body: impl FnOnce(&mut PhaseLog) -> Result<T>,
    ) -> Result<T> {
        match body(phase) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::error!(skill = %phase.skill, phase = %phase.current, error = %err, "rolling back");
                phase.enter(ApplyPhase::RestoringBackup);
                if backup.has_pending() {
                    if let Err(restore_err) = backup.restore() {
                        tracing::error!(error = %restore_err, "backup restore failed; backup kept");
                        phase.enter(ApplyPhase::Failed);
                        return Err(err);
                    }
                }
                phase.enter(ApplyPhase::ClearingBackup);
                if let Err(clear_err) = backup.clear() {
                    tracing::warn!(error = %clear_err, "failed to clear backup");
                }
                phase.enter(ApplyPhase::Failed);
                Err(err)
            }
        }
    }

    /// Structured edits, state commit, baseline refresh, backup clear.
    fn finish(
        &self,
        phase: &mut PhaseLog,
        manifest: &SkillManifest,
        backup: &BackupManager,
    ) -> Result<ApplyResult> {
        phase.enter(ApplyPhase::StructuredMerging);
        let outcome = match manifest.structured.as_ref().filter(|edits| !edits.is_empty()) {
            Some(edits) => Some(StructuredMerger::new(&self.layout, &self.config).apply(edits)?),
            None => None,
        };

        phase.enter(ApplyPhase::CommittingState);
        let mut hashes = BTreeMap::new();
        for rel in manifest.adds.iter().chain(&manifest.modifies) {
            let live = self.layout.live(rel);
            if live.is_file() {
                hashes.insert(rel.clone(), hash_file(&live)?);
            } else {
                tracing::warn!(path = rel.as_str(), "declared file missing after apply");
            }
        }
        let outcome = outcome.filter(|o| !o.is_empty());
        self.state_store()
            .record_application(&manifest.skill, &manifest.version, hashes, outcome.clone())?;

        phase.enter(ApplyPhase::RefreshingBaselines);
        for rel in manifest.adds.iter().chain(&manifest.modifies) {
            let live = self.layout.live(rel);
            if live.is_file() {
                copy_file(&live, &self.layout.baseline(rel))?;
            }
        }

        phase.enter(ApplyPhase::ClearingBackup);
        backup.clear()?;
        phase.enter(ApplyPhase::Succeeded);

        let mut result = ApplyResult::new(manifest);
        result.success = true;
        result.structured = outcome;
        Ok(result)
    }

    fn record_pending(
        &self,
        manifest: &SkillManifest,
        skill_dir: &Path,
        report: MergeReport,
    ) -> Result<ApplyResult> {
        let pending = PendingApplication {
            transaction_id: Uuid::new_v4().to_string(),
            skill: manifest.skill.clone(),
            version: manifest.version.clone(),
            skill_dir: skill_dir.to_path_buf(),
            conflicts: report.conflicts.clone(),
            resolution_keys: report.resolution_keys,
            created_at: Utc::now(),
        };
        pending.save(&self.layout.pending_file())?;
        tracing::warn!(
            skill = %manifest.skill,
            conflicts = ?report.conflicts,
            "merge conflicts left for manual resolution; backup retained"
        );

        let err = SkpError::ConflictsPending(report.conflicts.clone());
        let mut result = ApplyResult::failed(manifest, &err);
        result.merge_conflicts = Some(report.conflicts);
        result.auto_resolved = report.auto_resolved;
        Ok(result)
    }

    /// Every project-relative path the run may create or overwrite.
    fn backup_targets(&self, manifest: &SkillManifest, skill_dir: &Path) -> Vec<String> {
        let mut targets = BTreeSet::new();
        let declared = manifest.adds.iter().chain(&manifest.modifies);
        for rel in declared.clone() {
            targets.insert(rel.clone());
        }

        let add_dir = SkillManifest::add_dir(skill_dir);
        for entry in WalkDir::new(&add_dir).min_depth(1).into_iter().flatten() {
            if entry.file_type().is_file() {
                if let Ok(rel) = entry.path().strip_prefix(&add_dir) {
                    targets.insert(to_slash(rel));
                }
            }
        }

        let root = self.layout.root();
        let mut extra: Vec<PathBuf> = vec![
            root.join(&self.config.paths.dependency_manifest),
            root.join(&self.config.paths.env_file),
            self.layout.state_file(),
        ];
        extra.extend(declared.map(|rel| self.layout.baseline(rel)));
        for path in extra {
            if let Ok(rel) = path.strip_prefix(root) {
                targets.insert(to_slash(rel));
            }
        }

        targets.into_iter().collect()
    }
}

/// Current phase of one run, logged on every transition.
struct PhaseLog {
    skill: String,
    current: ApplyPhase,
}

impl PhaseLog {
    const fn new() -> Self {
        Self {
            skill: String::new(),
            current: ApplyPhase::Validating,
        }
    }

    fn enter(&mut self, next: ApplyPhase) {
        tracing::debug!(skill = %self.skill, from = %self.current, to = %next, "phase transition");
        self.current = next;
    }
}
