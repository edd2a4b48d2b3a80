use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkpError};
use crate::utils::is_safe_relative;

pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const ADD_DIR: &str = "add";
pub const MODIFY_DIR: &str = "modify";

/// Validated skill metadata, loaded fresh for every application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillManifest {
    pub skill: String,
    pub version: String,
    pub core_version: String,
    #[serde(default)]
    pub description: String,
    pub adds: Vec<String>,
    pub modifies: Vec<String>,
    #[serde(default)]
    pub structured: Option<StructuredEdits>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub test: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuredEdits {
    #[serde(default)]
    pub npm_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub env_additions: Vec<String>,
}

impl StructuredEdits {
    pub fn is_empty(&self) -> bool {
        self.npm_dependencies.is_empty() && self.env_additions.is_empty()
    }
}

/// Parsed form where every field may be absent, so that a missing field is
/// reported by name instead of as a generic parse failure.
#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    skill: Option<String>,
    version: Option<String>,
    core_version: Option<String>,
    description: Option<String>,
    adds: Option<Vec<String>>,
    modifies: Option<Vec<String>>,
    structured: Option<StructuredEdits>,
    conflicts: Option<Vec<String>>,
    depends: Option<Vec<String>>,
    test: Option<String>,
}

impl SkillManifest {
    /// Read and validate `<skill_dir>/manifest.yaml`.
    pub fn load(skill_dir: &Path) -> Result<Self> {
        let path = skill_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(SkpError::Manifest(format!(
                "manifest not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(&path)
            .map_err(|err| SkpError::Manifest(format!("read {}: {err}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let raw: RawManifest = serde_yaml::from_str(input)
            .map_err(|err| SkpError::Manifest(format!("YAML parse error: {err}")))?;

        let manifest = Self {
            skill: required("skill", raw.skill)?,
            version: required("version", raw.version)?,
            core_version: required("core_version", raw.core_version)?,
            description: raw.description.unwrap_or_default(),
            adds: required("adds", raw.adds)?,
            modifies: required("modifies", raw.modifies)?,
            structured: raw.structured,
            conflicts: raw.conflicts.unwrap_or_default(),
            depends: raw.depends.unwrap_or_default(),
            test: raw.test,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty("skill", &self.skill)?;
        validate_semver("version", &self.version)?;
        validate_semver_req("core_version", &self.core_version)?;

        for (field, paths) in [("adds", &self.adds), ("modifies", &self.modifies)] {
            let mut seen = HashSet::new();
            for rel in paths {
                if !is_safe_relative(rel) {
                    return Err(SkpError::Manifest(format!(
                        "{field} entry must be a relative path inside the project: {rel}"
                    )));
                }
                if !seen.insert(rel.as_str()) {
                    return Err(SkpError::Manifest(format!("duplicate {field} entry: {rel}")));
                }
            }
        }

        if let Some(structured) = &self.structured {
            for (name, version) in &structured.npm_dependencies {
                validate_non_empty("structured.npm_dependencies", name)?;
                validate_non_empty("structured.npm_dependencies", version)?;
            }
            for name in &structured.env_additions {
                validate_non_empty("structured.env_additions", name)?;
            }
        }

        Ok(())
    }

    /// Replacement content the skill supplies for a modified path.
    pub fn modify_source(skill_dir: &Path, rel: &str) -> PathBuf {
        skill_dir.join(MODIFY_DIR).join(rel)
    }

    pub fn add_dir(skill_dir: &Path) -> PathBuf {
        skill_dir.join(ADD_DIR)
    }

    /// Whether the recorded core version satisfies `core_version`.
    pub fn supports_core(&self, core_version: &str) -> bool {
        match (
            VersionReq::parse(&self.core_version),
            Version::parse(core_version),
        ) {
            (Ok(req), Ok(version)) => req.matches(&version),
            _ => false,
        }
    }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| SkpError::Manifest(format!("missing required field: {field}")))
}

fn validate_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SkpError::Manifest(format!("{field} must be non-empty")));
    }
    Ok(())
}

fn validate_semver(field: &str, value: &str) -> Result<()> {
    Version::parse(value)
        .map_err(|err| SkpError::Manifest(format!("{field} must be valid semver: {err}")))?;
    Ok(())
}

fn validate_semver_req(field: &str, value: &str) -> Result<()> {
    VersionReq::parse(value).map_err(|err| {
        SkpError::Manifest(format!("{field} must be valid semver range: {err}"))
    })?;
    Ok(())
}
