//! Record of an application that stopped on unresolved conflicts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApplication {
    pub transaction_id: String,
    pub skill: String,
    pub version: String,
    pub skill_dir: PathBuf,
    pub conflicts: Vec<String>,
    /// Conflicted path -> resolution cache key.
    #[serde(default)]
    pub resolution_keys: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl PendingApplication {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_yaml::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn remove(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
