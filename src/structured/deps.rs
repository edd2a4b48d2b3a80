//! Dependency-map merge into a JSON package manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SkpError};

const DEPENDENCIES_KEY: &str = "dependencies";

/// Insert `additions` into the manifest's `dependencies` object.
///
/// A name already present with a different version is a
/// [`SkpError::StructuredConflict`] and leaves the file untouched. Entries are
/// written back sorted by name; every other key keeps its position. Returns
/// the pairs that were actually added.
pub fn merge_dependencies(
    path: &Path,
    additions: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    if additions.is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw = fs::read_to_string(path).map_err(|err| {
        SkpError::Io(std::io::Error::new(
            err.kind(),
            format!("read {}: {err}", path.display()),
        ))
    })?;
    let mut document: Value = serde_json::from_str(&raw)?;
    let Some(root) = document.as_object_mut() else {
        return Err(SkpError::Serialization(format!(
            "{} is not a JSON object",
            path.display()
        )));
    };

    let existing = match root.get(DEPENDENCIES_KEY) {
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(SkpError::Serialization(format!(
                "{DEPENDENCIES_KEY} in {} is not an object",
                path.display()
            )));
        }
        None => Map::new(),
    };

    let mut sorted: BTreeMap<String, Value> = existing.into_iter().collect();
    let mut added = BTreeMap::new();
    for (name, version) in additions {
        match sorted.get(name) {
            Some(current) if current.as_str() == Some(version.as_str()) => {}
            Some(current) => {
                return Err(SkpError::StructuredConflict {
                    name: name.clone(),
                    existing: current
                        .as_str()
                        .map_or_else(|| current.to_string(), str::to_string),
                    requested: version.clone(),
                });
            }
            None => {
                sorted.insert(name.clone(), Value::String(version.clone()));
                added.insert(name.clone(), version.clone());
            }
        }
    }

    if added.is_empty() {
        return Ok(added);
    }

    root.insert(
        DEPENDENCIES_KEY.to_string(),
        Value::Object(sorted.into_iter().collect()),
    );
    let mut output = serde_json::to_string_pretty(&document)?;
    output.push('\n');
    fs::write(path, output)?;

    tracing::info!(count = added.len(), path = %path.display(), "dependencies added");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn additions(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, version)| ((*name).to_string(), (*version).to_string()))
            .collect()
    }

    #[test]
    fn adds_and_sorts_keeping_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        fs::write(
            &path,
            r#"{"name":"app","dependencies":{"zod":"3.0.0"},"scripts":{"build":"tsc"}}"#,
        )
        .unwrap();

        let added = merge_dependencies(&path, &additions(&[("left-pad", "1.0.0")])).unwrap();
        assert_eq!(added, additions(&[("left-pad", "1.0.0")]));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("}\n"));
        assert!(content.find("left-pad").unwrap() < content.find("zod").unwrap());
        assert!(content.find("\"name\"").unwrap() < content.find("\"scripts\"").unwrap());
        assert!(content.contains("\n  \"name\": \"app\""));
    }

    #[test]
    fn differing_version_conflicts_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        let original = r#"{"dependencies":{"left-pad":"1.0.0"}}"#;
        fs::write(&path, original).unwrap();

        let err = merge_dependencies(&path, &additions(&[("left-pad", "2.0.0")])).unwrap_err();
        match err {
            SkpError::StructuredConflict {
                name,
                existing,
                requested,
            } => {
                assert_eq!(name, "left-pad");
                assert_eq!(existing, "1.0.0");
                assert_eq!(requested, "2.0.0");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn same_version_is_not_added_again() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        let original = r#"{"dependencies":{"left-pad":"1.0.0"}}"#;
        fs::write(&path, original).unwrap();

        let added = merge_dependencies(&path, &additions(&[("left-pad", "1.0.0")])).unwrap();
        assert!(added.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn creates_dependencies_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, r#"{"name":"app"}"#).unwrap();

        merge_dependencies(&path, &additions(&[("b", "1"), ("a", "2")])).unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let keys: Vec<_> = value["dependencies"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
