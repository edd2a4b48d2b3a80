//! Drift between live files and what the engine last saw.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::storage::{EngineState, ProjectLayout};
use crate::utils::hash_file;

/// Modified paths whose live content no longer matches the baseline.
///
/// Paths missing either side are skipped. Informational: drift only means
/// the three-way merge has real work to do.
pub fn detect_drift(layout: &ProjectLayout, modifies: &[String]) -> Result<Vec<String>> {
    let mut drifted = Vec::new();
    for rel in modifies {
        let live = layout.live(rel);
        let base = layout.baseline(rel);
        if !live.is_file() || !base.is_file() {
            continue;
        }
        if hash_file(&live)? != hash_file(&base)? {
            tracing::info!(path = rel.as_str(), "drift detected");
            drifted.push(rel.clone());
        }
    }
    Ok(drifted)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedChange {
    Modified,
    Missing,
}

/// A tracked file that changed since the skill owning it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedDrift {
    pub path: String,
    pub skill: String,
    pub change: TrackedChange,
}

/// Compare every recorded file hash against disk. When several skills
/// recorded the same path, the latest application wins.
pub fn tracked_drift(layout: &ProjectLayout, state: &EngineState) -> Result<Vec<TrackedDrift>> {
    let mut expected: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
    for skill in &state.applied_skills {
        for (path, hash) in &skill.file_hashes {
            expected.insert(path.as_str(), (skill.name.as_str(), hash.as_str()));
        }
    }

    let mut drift = Vec::new();
    for (path, (skill, hash)) in expected {
        let live = layout.live(path);
        let change = if !live.is_file() {
            Some(TrackedChange::Missing)
        } else if hash_file(&live)? != hash {
            Some(TrackedChange::Modified)
        } else {
            None
        };
        if let Some(change) = change {
            drift.push(TrackedDrift {
                path: path.to_string(),
                skill: skill.to_string(),
                change,
            });
        }
    }
    Ok(drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AppliedSkill;
    use crate::utils::hash_bytes;
    use chrono::Utc;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &std::path::Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn flags_only_changed_files() {
        let dir = tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), ".skp");
        write(&layout.live("same.txt"), "x\n");
        write(&layout.baseline("same.txt"), "x\n");
        write(&layout.live("changed.txt"), "local\n");
        write(&layout.baseline("changed.txt"), "base\n");
        write(&layout.live("untracked.txt"), "y\n");

        let drift = detect_drift(
            &layout,
            &[
                "same.txt".to_string(),
                "changed.txt".to_string(),
                "untracked.txt".to_string(),
                "absent.txt".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(drift, vec!["changed.txt"]);
    }

    #[test]
    fn tracked_drift_reports_modified_and_missing() {
        let dir = tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), ".skp");
        write(&layout.live("a.txt"), "edited\n");
        write(&layout.live("b.txt"), "b\n");

        let mut state = EngineState::new("1.0.0");
        state.upsert(AppliedSkill {
            name: "foo".to_string(),
            version: "1.0.0".to_string(),
            applied_at: Utc::now(),
            file_hashes: BTreeMap::from([
                ("a.txt".to_string(), hash_bytes(b"a\n")),
                ("b.txt".to_string(), hash_bytes(b"b\n")),
                ("c.txt".to_string(), hash_bytes(b"c\n")),
            ]),
            structured_outcomes: None,
        });

        let drift = tracked_drift(&layout, &state).unwrap();
        assert_eq!(drift.len(), 2);
        assert_eq!(drift[0].path, "a.txt");
        assert_eq!(drift[0].change, TrackedChange::Modified);
        assert_eq!(drift[1].path, "c.txt");
        assert_eq!(drift[1].change, TrackedChange::Missing);
    }
}
