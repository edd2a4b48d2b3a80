//! Persisted engine state: which skills are applied and what they produced.
//!
//! The state file is a single YAML document under the engine directory.
//! Records are unique by skill name; re-applying a skill replaces its
//! previous record.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkpError};
use crate::utils::ensure_dir;

/// Schema version written by this build.
pub const CURRENT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub skills_system_version: String,
    pub core_version: String,
    #[serde(default)]
    pub applied_skills: Vec<AppliedSkill>,
}

impl EngineState {
    pub fn new(core_version: impl Into<String>) -> Self {
        Self {
            skills_system_version: CURRENT_VERSION.to_string(),
            core_version: core_version.into(),
            applied_skills: Vec::new(),
        }
    }

    pub fn applied(&self, name: &str) -> Option<&AppliedSkill> {
        self.applied_skills.iter().find(|skill| skill.name == name)
    }

    /// Replace any record with the same name, then append.
    pub fn upsert(&mut self, record: AppliedSkill) {
        self.applied_skills.retain(|skill| skill.name != record.name);
        self.applied_skills.push(record);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSkill {
    pub name: String,
    pub version: String,
    pub applied_at: DateTime<Utc>,
    #[serde(default)]
    pub file_hashes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_outcomes: Option<StructuredOutcome>,
}

/// What the structured merger actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredOutcome {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies_added: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_added: Vec<String>,
    #[serde(default)]
    pub install_ran: bool,
}

impl StructuredOutcome {
    pub fn is_empty(&self) -> bool {
        self.dependencies_added.is_empty() && self.env_added.is_empty() && !self.install_ran
    }
}

/// Name/version projection used by the dependency and conflict checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedSummary {
    pub name: String,
    pub version: String,
}

/// Reads and writes `state.yaml`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn read(&self) -> Result<EngineState> {
        if !self.path.exists() {
            return Err(SkpError::NotInitialized(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path)?;
        let state: EngineState = serde_yaml::from_str(&content).map_err(|err| {
            SkpError::Serialization(format!("parse {}: {err}", self.path.display()))
        })?;

        if is_newer(&state.skills_system_version, CURRENT_VERSION)? {
            return Err(SkpError::StateVersionMismatch {
                found: state.skills_system_version,
                supported: CURRENT_VERSION.to_string(),
            });
        }

        Ok(state)
    }

    pub fn write(&self, state: &EngineState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let content = serde_yaml::to_string(state)?;
        // Never leave a truncated state file behind.
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Write an empty state for `core_version`, replacing any existing one.
    pub fn initialize(&self, core_version: &str) -> Result<EngineState> {
        let state = EngineState::new(core_version);
        self.write(&state)?;
        Ok(state)
    }

    /// Replace any previous record for `name` with a fresh one.
    pub fn record_application(
        &self,
        name: &str,
        version: &str,
        file_hashes: BTreeMap<String, String>,
        structured_outcomes: Option<StructuredOutcome>,
    ) -> Result<AppliedSkill> {
        let mut state = self.read()?;
        let record = AppliedSkill {
            name: name.to_string(),
            version: version.to_string(),
            applied_at: Utc::now(),
            file_hashes,
            structured_outcomes,
        };
        state.upsert(record.clone());
        self.write(&state)?;
        tracing::info!(skill = name, version, "recorded skill application");
        Ok(record)
    }

    pub fn list_applied(&self) -> Result<Vec<AppliedSummary>> {
        Ok(self
            .read()?
            .applied_skills
            .into_iter()
            .map(|skill| AppliedSummary {
                name: skill.name,
                version: skill.version,
            })
            .collect())
    }
}

fn is_newer(found: &str, supported: &str) -> Result<bool> {
    let found_version = Version::parse(found).map_err(|err| {
        SkpError::Serialization(format!("invalid skills_system_version {found}: {err}"))
    })?;
    let supported_version = Version::parse(supported)
        .map_err(|err| SkpError::Config(format!("invalid engine version {supported}: {err}")))?;
    Ok(found_version > supported_version)
}
