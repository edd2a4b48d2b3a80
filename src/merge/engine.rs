//! Per-file merge of a skill's modified paths into the live tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Result, SkpError};
use crate::merge::driver::MergeDriver;
use crate::merge::rerere::{ConflictInputs, ResolutionCache};
use crate::skill::SkillManifest;
use crate::storage::ProjectLayout;
use crate::utils::copy_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileMergeStatus {
    /// Live file was absent; skill content installed as-is.
    Installed,
    Clean,
    /// Conflict replayed from the resolution cache.
    AutoResolved,
    /// Markers written to the live file. `key` identifies the recorded
    /// preimage when a resolution cache is in use.
    Conflict { key: Option<String> },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub installed: Vec<String>,
    pub merged: Vec<String>,
    pub auto_resolved: Vec<String>,
    pub conflicts: Vec<String>,
    /// Conflicted path -> resolution cache key.
    pub resolution_keys: BTreeMap<String, String>,
}

impl MergeReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

pub struct FileMerger<'a> {
    layout: &'a ProjectLayout,
    driver: &'a dyn MergeDriver,
    cache: Option<&'a ResolutionCache>,
}

impl<'a> FileMerger<'a> {
    pub fn new(
        layout: &'a ProjectLayout,
        driver: &'a dyn MergeDriver,
        cache: Option<&'a ResolutionCache>,
    ) -> Self {
        Self {
            layout,
            driver,
            cache,
        }
    }

    /// Merge every path; conflicts are collected, any other failure aborts.
    pub fn merge_all(&self, skill_dir: &Path, modifies: &[String]) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        for rel in modifies {
            match self.merge_one(skill_dir, rel)? {
                FileMergeStatus::Installed => report.installed.push(rel.clone()),
                FileMergeStatus::Clean => report.merged.push(rel.clone()),
                FileMergeStatus::AutoResolved => {
                    report.merged.push(rel.clone());
                    report.auto_resolved.push(rel.clone());
                }
                FileMergeStatus::Conflict { key } => {
                    if let Some(key) = key {
                        report.resolution_keys.insert(rel.clone(), key);
                    }
                    report.conflicts.push(rel.clone());
                }
            }
        }
        Ok(report)
    }

    pub fn merge_one(&self, skill_dir: &Path, rel: &str) -> Result<FileMergeStatus> {
        let theirs = SkillManifest::modify_source(skill_dir, rel);
        if !theirs.is_file() {
            return Err(SkpError::MergeSourceMissing(theirs));
        }

        let live = self.layout.live(rel);
        if !live.exists() {
            copy_file(&theirs, &live)?;
            tracing::debug!(path = rel, "installed modified file verbatim");
            return Ok(FileMergeStatus::Installed);
        }

        let base = self.layout.baseline(rel);
        if !base.exists() {
            copy_file(&live, &base)?;
            tracing::debug!(path = rel, "baseline created from current content");
        }

        // The driver rewrites its first argument; never hand it the live file.
        let working = NamedTempFile::new()?;
        fs::copy(&live, working.path())?;
        let outcome = self.driver.merge(working.path(), &base, &theirs)?;

        if outcome.clean {
            fs::copy(working.path(), &live)?;
            tracing::debug!(path = rel, driver = self.driver.name(), "clean merge");
            return Ok(FileMergeStatus::Clean);
        }

        let mut key = None;
        if let Some(cache) = self.cache {
            let base_bytes = fs::read(&base)?;
            let ours_bytes = fs::read(&live)?;
            let theirs_bytes = fs::read(&theirs)?;
            let inputs = ConflictInputs {
                path: rel,
                base: &base_bytes,
                ours: &ours_bytes,
                theirs: &theirs_bytes,
            };
            let lookup_key = inputs.key();
            if let Some(resolved) = cache.lookup(&lookup_key)? {
                fs::write(&live, resolved)?;
                tracing::info!(path = rel, "conflict resolved from recorded resolution");
                return Ok(FileMergeStatus::AutoResolved);
            }
            let conflicted = fs::read(working.path())?;
            key = Some(cache.record_preimage(&inputs, &conflicted)?);
        }

        fs::copy(working.path(), &live)?;
        tracing::warn!(path = rel, conflicts = outcome.conflicts, "unresolved merge conflict");
        Ok(FileMergeStatus::Conflict { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::diff3::has_conflict_markers;
    use crate::merge::diff3::MarkerLabels;
    use crate::merge::driver::{Diff3Driver, GitMergeFileDriver};
    use tempfile::{TempDir, tempdir};

    struct Setup {
        _dir: TempDir,
        layout: ProjectLayout,
        skill_dir: std::path::PathBuf,
    }

    fn setup() -> Setup {
        let dir = tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path().join("project"), ".skp");
        fs::create_dir_all(layout.root()).unwrap();
        let skill_dir = dir.path().join("skill");
        fs::create_dir_all(skill_dir.join("modify")).unwrap();
        Setup {
            _dir: dir,
            layout,
            skill_dir,
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_skill_source_is_fatal() {
        let s = setup();
        let driver = Diff3Driver::default();
        let merger = FileMerger::new(&s.layout, &driver, None);
        let err = merger.merge_one(&s.skill_dir, "a.txt").unwrap_err();
        assert!(matches!(err, SkpError::MergeSourceMissing(_)));
    }

    #[test]
    fn absent_live_file_installs_verbatim() {
        let s = setup();
        write(&s.skill_dir.join("modify/src/new.txt"), "skill\n");
        let driver = Diff3Driver::default();
        let merger = FileMerger::new(&s.layout, &driver, None);
        assert_eq!(
            merger.merge_one(&s.skill_dir, "src/new.txt").unwrap(),
            FileMergeStatus::Installed
        );
        assert_eq!(fs::read_to_string(s.layout.live("src/new.txt")).unwrap(), "skill\n");
        assert!(!s.layout.baseline("src/new.txt").exists());
    }

    #[test]
    fn first_touch_creates_baseline_and_takes_skill_content() {
        let s = setup();
        write(&s.layout.live("a.txt"), "one\ntwo\n");
        write(&s.skill_dir.join("modify/a.txt"), "one\ntwo\nthree\n");
        let driver = Diff3Driver::default();
        let merger = FileMerger::new(&s.layout, &driver, None);

        assert_eq!(merger.merge_one(&s.skill_dir, "a.txt").unwrap(), FileMergeStatus::Clean);
        assert_eq!(fs::read_to_string(s.layout.baseline("a.txt")).unwrap(), "one\ntwo\n");
        assert_eq!(fs::read_to_string(s.layout.live("a.txt")).unwrap(), "one\ntwo\nthree\n");
    }

    #[test]
    fn conflict_writes_markers_and_replays_resolution() {
        let s = setup();
        let cache = ResolutionCache::at(s.layout.local_rr_cache());
        write(&s.layout.baseline("a.txt"), "line\n");
        write(&s.layout.live("a.txt"), "local\n");
        write(&s.skill_dir.join("modify/a.txt"), "skill\n");
        let driver = Diff3Driver::default();
        let merger = FileMerger::new(&s.layout, &driver, Some(&cache));

        let report = merger.merge_all(&s.skill_dir, &["a.txt".to_string()]).unwrap();
        assert_eq!(report.conflicts, vec!["a.txt"]);
        let key = report.resolution_keys["a.txt"].clone();
        assert!(has_conflict_markers(&fs::read(s.layout.live("a.txt")).unwrap()));

        // User resolves by hand; the resolution is learned.
        cache.record_resolution(&key, b"local and skill\n").unwrap();
        write(&s.layout.live("a.txt"), "local\n");

        assert_eq!(
            merger.merge_one(&s.skill_dir, "a.txt").unwrap(),
            FileMergeStatus::AutoResolved
        );
        assert_eq!(fs::read_to_string(s.layout.live("a.txt")).unwrap(), "local and skill\n");
    }

    #[test]
    fn conflicts_do_not_stop_remaining_paths() {
        let s = setup();
        write(&s.layout.baseline("a.txt"), "line\n");
        write(&s.layout.live("a.txt"), "local\n");
        write(&s.skill_dir.join("modify/a.txt"), "skill\n");
        write(&s.skill_dir.join("modify/b.txt"), "b\n");
        let driver = Diff3Driver::default();
        let merger = FileMerger::new(&s.layout, &driver, None);

        let report = merger
            .merge_all(&s.skill_dir, &["a.txt".to_string(), "b.txt".to_string()])
            .unwrap();
        assert_eq!(report.conflicts, vec!["a.txt"]);
        assert_eq!(report.installed, vec!["b.txt"]);
        assert!(report.resolution_keys.is_empty());
    }

    #[test]
    fn git_driver_merges_through_file_merger() {
        let Ok(driver) = GitMergeFileDriver::locate("git", MarkerLabels::default()) else {
            eprintln!("git not on PATH; skipping");
            return;
        };
        let s = setup();
        write(&s.layout.baseline("a.txt"), "a\nb\nc\nd\ne\nf\ng\n");
        write(&s.layout.live("a.txt"), "A\nb\nc\nd\ne\nf\ng\n");
        write(&s.skill_dir.join("modify/a.txt"), "a\nb\nc\nd\ne\nf\nG\n");
        write(&s.layout.baseline("b.txt"), "base\n");
        write(&s.layout.live("b.txt"), "local\n");
        write(&s.skill_dir.join("modify/b.txt"), "skill\n");
        let merger = FileMerger::new(&s.layout, &driver, None);

        assert_eq!(merger.merge_one(&s.skill_dir, "a.txt").unwrap(), FileMergeStatus::Clean);
        assert_eq!(
            fs::read_to_string(s.layout.live("a.txt")).unwrap(),
            "A\nb\nc\nd\ne\nf\nG\n"
        );

        let status = merger.merge_one(&s.skill_dir, "b.txt").unwrap();
        assert!(matches!(status, FileMergeStatus::Conflict { .. }));
        let live = fs::read_to_string(s.layout.live("b.txt")).unwrap();
        assert!(live.contains("<<<<<<< current"));
        assert!(live.contains(">>>>>>> skill"));
    }
}
