//! Transaction-scoped backup of the files an application is about to touch.
//!
//! `capture` copies every existing target into `backup/` (mirroring relative
//! paths) and writes an index recording which targets did not exist yet.
//! `restore` puts the captured bytes back and removes the files that were
//! created after capture. `clear` discards both.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkpError};
use crate::storage::layout::ProjectLayout;
use crate::utils::{copy_file, ensure_dir};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupIndex {
    pub captured_at: Option<DateTime<Utc>>,
    /// Paths whose bytes were copied into the backup tree.
    #[serde(default)]
    pub captured: Vec<String>,
    /// Paths that did not exist at capture time.
    #[serde(default)]
    pub absent: Vec<String>,
    /// Parent directories of `absent` paths that did not exist either.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absent_dirs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
    backup_dir: PathBuf,
    index_path: PathBuf,
}

impl BackupManager {
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            root: layout.root().to_path_buf(),
            backup_dir: layout.backup_dir(),
            index_path: layout.backup_index(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// True while a captured backup has been neither cleared nor restored.
    pub fn has_pending(&self) -> bool {
        self.index_path.exists()
    }

    pub fn capture<I, S>(&self, paths: I) -> Result<BackupIndex>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.has_pending() {
            return Err(SkpError::Backup(format!(
                "a backup is already captured at {}",
                self.backup_dir.display()
            )));
        }
        if self.backup_dir.exists() {
            fs::remove_dir_all(&self.backup_dir)?;
        }
        ensure_dir(&self.backup_dir)?;

        let mut index = BackupIndex {
            captured_at: Some(Utc::now()),
            ..BackupIndex::default()
        };
        for rel in paths {
            let rel = rel.as_ref();
            if index.captured.iter().any(|p| p == rel) || index.absent.iter().any(|p| p == rel) {
                continue;
            }
            let source = self.root.join(rel);
            if source.is_file() {
                copy_file(&source, &self.backup_dir.join(rel))?;
                index.captured.push(rel.to_string());
            } else if !source.exists() {
                index.absent.push(rel.to_string());
                for dir in Path::new(rel).ancestors().skip(1) {
                    if dir.as_os_str().is_empty() || self.root.join(dir).exists() {
                        break;
                    }
                    let dir = dir.to_string_lossy().into_owned();
                    if !index.absent_dirs.contains(&dir) {
                        index.absent_dirs.push(dir);
                    }
                }
            }
        }

        fs::write(&self.index_path, serde_yaml::to_string(&index)?)?;
        tracing::debug!(
            captured = index.captured.len(),
            absent = index.absent.len(),
            "backup captured"
        );
        Ok(index)
    }

    /// Overwrite every backed-up file and delete the files created since
    /// capture. A full rollback: never applied partially.
    pub fn restore(&self) -> Result<()> {
        let index = self.read_index()?;

        for rel in &index.captured {
            copy_file(&self.backup_dir.join(rel), &self.root.join(rel))?;
        }
        for rel in &index.absent {
            let path = self.root.join(rel);
            if path.is_file() {
                fs::remove_file(&path)?;
            }
        }
        // Deepest first so nested created directories empty out in order.
        let mut dirs: Vec<&String> = index.absent_dirs.iter().collect();
        dirs.sort_by_key(|dir| std::cmp::Reverse(Path::new(dir.as_str()).components().count()));
        for rel in dirs {
            let path = self.root.join(rel);
            if path.is_dir() && fs::read_dir(&path)?.next().is_none() {
                fs::remove_dir(&path)?;
            }
        }

        tracing::info!(
            restored = index.captured.len(),
            removed = index.absent.len(),
            "backup restored"
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.backup_dir.exists() {
            fs::remove_dir_all(&self.backup_dir)?;
        }
        if self.index_path.exists() {
            fs::remove_file(&self.index_path)?;
        }
        Ok(())
    }

    pub fn read_index(&self) -> Result<BackupIndex> {
        let content = fs::read_to_string(&self.index_path).map_err(|err| {
            SkpError::Backup(format!("read {}: {err}", self.index_path.display()))
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
