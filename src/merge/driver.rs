//! Three-way merge drivers.
//!
//! A driver merges `base -> theirs` into `ours`, rewriting `ours` in place,
//! and reports how many conflict regions it left behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::config::{MergeConfig, MergeDriverKind};
use crate::error::{Result, SkpError};
use crate::merge::diff3::{self, MarkerLabels};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub clean: bool,
    pub conflicts: usize,
}

impl MergeOutcome {
    pub const fn from_conflicts(conflicts: usize) -> Self {
        Self {
            clean: conflicts == 0,
            conflicts,
        }
    }
}

pub trait MergeDriver {
    fn name(&self) -> &'static str;

    /// Merge in place: `ours` receives the result, conflict markers included.
    fn merge(&self, ours: &Path, base: &Path, theirs: &Path) -> Result<MergeOutcome>;
}

/// In-process diff3.
#[derive(Debug, Clone, Default)]
pub struct Diff3Driver {
    labels: MarkerLabels,
}

impl Diff3Driver {
    pub const fn new(labels: MarkerLabels) -> Self {
        Self { labels }
    }
}

impl MergeDriver for Diff3Driver {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn merge(&self, ours: &Path, base: &Path, theirs: &Path) -> Result<MergeOutcome> {
        let ours_bytes = fs::read(ours)?;
        let base_bytes = fs::read(base)?;
        let theirs_bytes = fs::read(theirs)?;

        let merged = diff3::merge(&base_bytes, &ours_bytes, &theirs_bytes, &self.labels);
        fs::write(ours, &merged.content)?;
        Ok(MergeOutcome::from_conflicts(merged.conflicts))
    }
}

/// `git merge-file` subprocess. Exit status is the conflict count; negative
/// statuses (255 after truncation) and signals are failures.
#[derive(Debug, Clone)]
pub struct GitMergeFileDriver {
    binary: PathBuf,
    labels: MarkerLabels,
}

impl GitMergeFileDriver {
    pub fn locate(binary: &str, labels: MarkerLabels) -> Result<Self> {
        let binary = which::which(binary)
            .map_err(|err| SkpError::MergeDriver(format!("{binary} not found: {err}")))?;
        Ok(Self { binary, labels })
    }
}

impl MergeDriver for GitMergeFileDriver {
    fn name(&self) -> &'static str {
        "git"
    }

    fn merge(&self, ours: &Path, base: &Path, theirs: &Path) -> Result<MergeOutcome> {
        let output = Command::new(&self.binary)
            .arg("merge-file")
            .args(["-L", self.labels.ours.as_str(), "-L", "base", "-L", self.labels.theirs.as_str()])
            .arg(ours)
            .arg(base)
            .arg(theirs)
            .output()
            .map_err(|err| SkpError::MergeDriver(format!("spawn git merge-file: {err}")))?;

        match output.status.code() {
            Some(0) => Ok(MergeOutcome::from_conflicts(0)),
            Some(code @ 1..=127) => Ok(MergeOutcome::from_conflicts(code.unsigned_abs() as usize)),
            Some(code) => Err(SkpError::MergeDriver(format!(
                "git merge-file exited with {code}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            None => Err(SkpError::MergeDriver(
                "git merge-file terminated by signal".to_string(),
            )),
        }
    }
}

/// Build the driver selected in configuration.
pub fn driver_from_config(config: &MergeConfig) -> Result<Box<dyn MergeDriver>> {
    let labels = MarkerLabels {
        ours: config.ours_label.clone(),
        theirs: config.theirs_label.clone(),
    };
    match config.driver {
        MergeDriverKind::Builtin => Ok(Box::new(Diff3Driver::new(labels))),
        MergeDriverKind::Git => Ok(Box::new(GitMergeFileDriver::locate(&config.git_binary, labels)?)),
    }
}
