//! Recorded conflict resolutions ("reuse recorded resolution").
//!
//! Entries are keyed by a hash of the three merge inputs. A conflict leaves
//! a `preimage` (the marker-annotated text) behind; once the user resolves
//! the file, the resolved text is stored as `postimage` and replayed the next
//! time the same three inputs collide.
//!
//! The store is scoped to the version-control workspace: inside a git work
//! tree it lives under the git directory, otherwise under the engine
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage::ProjectLayout;
use crate::utils::hash::hash_parts;
use crate::utils::ensure_dir;

const GIT_CACHE_DIR: &str = "skp-rr-cache";
const PREIMAGE: &str = "preimage";
const POSTIMAGE: &str = "postimage";
const PATH_FILE: &str = "path";

/// The three inputs of one conflicting merge.
#[derive(Debug, Clone, Copy)]
pub struct ConflictInputs<'a> {
    pub path: &'a str,
    pub base: &'a [u8],
    pub ours: &'a [u8],
    pub theirs: &'a [u8],
}

impl ConflictInputs<'_> {
    pub fn key(&self) -> String {
        hash_parts(&[self.base, self.ours, self.theirs])
    }
}

#[derive(Debug, Clone)]
pub struct ResolutionCache {
    dir: PathBuf,
}

impl ResolutionCache {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pick the store location for a project.
    pub fn for_project(layout: &ProjectLayout) -> Self {
        match git2::Repository::discover(layout.root()) {
            Ok(repo) => {
                tracing::debug!(git_dir = %repo.path().display(), "resolution cache scoped to git workspace");
                Self::at(repo.path().join(GIT_CACHE_DIR))
            }
            Err(_) => Self::at(layout.local_rr_cache()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Previously accepted result for these inputs, if any.
    pub fn lookup(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let post = self.dir.join(key).join(POSTIMAGE);
        if post.is_file() {
            Ok(Some(fs::read(post)?))
        } else {
            Ok(None)
        }
    }

    /// Remember an unresolved conflict so its resolution can be learned.
    pub fn record_preimage(&self, inputs: &ConflictInputs<'_>, conflicted: &[u8]) -> Result<String> {
        let key = inputs.key();
        let entry = self.dir.join(&key);
        ensure_dir(&entry)?;
        fs::write(entry.join(PREIMAGE), conflicted)?;
        fs::write(entry.join(PATH_FILE), inputs.path)?;
        Ok(key)
    }

    /// Store the accepted result for a recorded conflict.
    pub fn record_resolution(&self, key: &str, resolved: &[u8]) -> Result<()> {
        let entry = self.dir.join(key);
        ensure_dir(&entry)?;
        fs::write(entry.join(POSTIMAGE), resolved)?;
        let pre = entry.join(PREIMAGE);
        if pre.exists() {
            fs::remove_file(pre)?;
        }
        Ok(())
    }

    /// Drop a preimage that will never be resolved.
    pub fn forget(&self, key: &str) -> Result<()> {
        let entry = self.dir.join(key);
        if entry.join(POSTIMAGE).exists() {
            return Ok(());
        }
        if entry.exists() {
            fs::remove_dir_all(entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn inputs() -> ConflictInputs<'static> {
        ConflictInputs {
            path: "shared.txt",
            base: b"base\n",
            ours: b"ours\n",
            theirs: b"theirs\n",
        }
    }

    #[test]
    fn key_depends_on_all_inputs() {
        let a = inputs();
        let mut b = inputs();
        b.theirs = b"other\n";
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), inputs().key());
    }

    #[test]
    fn records_and_replays_resolution() {
        let dir = tempdir().unwrap();
        let cache = ResolutionCache::at(dir.path().join("rr"));
        let key = cache.record_preimage(&inputs(), b"<<<<<<< current\n").unwrap();
        assert!(cache.lookup(&key).unwrap().is_none());

        cache.record_resolution(&key, b"merged\n").unwrap();
        assert_eq!(cache.lookup(&key).unwrap().unwrap(), b"merged\n");
    }

    #[test]
    fn forget_keeps_learned_resolutions() {
        let dir = tempdir().unwrap();
        let cache = ResolutionCache::at(dir.path());
        let key = cache.record_preimage(&inputs(), b"x").unwrap();
        cache.forget(&key).unwrap();
        assert!(!dir.path().join(&key).exists());

        let key = cache.record_preimage(&inputs(), b"x").unwrap();
        cache.record_resolution(&key, b"y").unwrap();
        cache.forget(&key).unwrap();
        assert!(cache.lookup(&key).unwrap().is_some());
    }

    #[test]
    fn non_git_project_uses_engine_dir() {
        let dir = tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), ".skp");
        let cache = ResolutionCache::for_project(&layout);
        // The temp dir may itself sit inside a git checkout.
        if git2::Repository::discover(dir.path()).is_err() {
            assert_eq!(cache.dir(), layout.local_rr_cache());
        }
    }

    #[test]
    fn git_project_uses_git_dir() {
        let dir = tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let layout = ProjectLayout::new(dir.path(), ".skp");
        let cache = ResolutionCache::for_project(&layout);
        assert!(cache.dir().ends_with(".git/skp-rr-cache"));
    }
}
