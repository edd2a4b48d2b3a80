//! Pre-flight checks against the set of already-applied skills.

use std::collections::HashSet;

use serde::Serialize;

use crate::skill::manifest::SkillManifest;
use crate::storage::AppliedSummary;

/// Outcome of a dependency or conflict check. `names` holds the missing
/// dependencies or the offending applied skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub ok: bool,
    pub names: Vec<String>,
}

impl CheckOutcome {
    fn from_names(names: Vec<String>) -> Self {
        Self {
            ok: names.is_empty(),
            names,
        }
    }
}

fn applied_names(applied: &[AppliedSummary]) -> HashSet<&str> {
    applied.iter().map(|skill| skill.name.as_str()).collect()
}

/// Ok iff every `depends` entry has been applied.
pub fn check_dependencies(manifest: &SkillManifest, applied: &[AppliedSummary]) -> CheckOutcome {
    let names = applied_names(applied);
    CheckOutcome::from_names(
        manifest
            .depends
            .iter()
            .filter(|dep| !names.contains(dep.as_str()))
            .cloned()
            .collect(),
    )
}

/// Ok iff no `conflicts` entry has been applied.
pub fn check_conflicts(manifest: &SkillManifest, applied: &[AppliedSummary]) -> CheckOutcome {
    let names = applied_names(applied);
    CheckOutcome::from_names(
        manifest
            .conflicts
            .iter()
            .filter(|name| names.contains(name.as_str()))
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(depends: &[&str], conflicts: &[&str]) -> SkillManifest {
        SkillManifest {
            skill: "s".to_string(),
            version: "1.0.0".to_string(),
            core_version: "0.1.0".to_string(),
            description: String::new(),
            adds: Vec::new(),
            modifies: Vec::new(),
            structured: None,
            conflicts: conflicts.iter().map(ToString::to_string).collect(),
            depends: depends.iter().map(ToString::to_string).collect(),
            test: None,
        }
    }

    fn applied(names: &[&str]) -> Vec<AppliedSummary> {
        names
            .iter()
            .map(|name| AppliedSummary {
                name: (*name).to_string(),
                version: "1.0.0".to_string(),
            })
            .collect()
    }

    #[test]
    fn dependencies_reports_missing_subset() {
        let outcome = check_dependencies(&manifest(&["a", "b", "c"], &[]), &applied(&["b"]));
        assert!(!outcome.ok);
        assert_eq!(outcome.names, vec!["a", "c"]);

        let outcome = check_dependencies(&manifest(&["b"], &[]), &applied(&["b"]));
        assert!(outcome.ok);
    }

    #[test]
    fn conflicts_reports_offending_subset() {
        let outcome = check_conflicts(&manifest(&[], &["x", "y"]), &applied(&["y", "z"]));
        assert!(!outcome.ok);
        assert_eq!(outcome.names, vec!["y"]);

        assert!(check_conflicts(&manifest(&[], &["x"]), &applied(&[])).ok);
    }
}
