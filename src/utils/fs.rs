//! Filesystem utilities.
//!
//! Helper functions for file operations.

use std::path::{Component, Path};

use walkdir::WalkDir;

use crate::error::{Result, SkpError};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Read a file to string, returning None if it doesn't exist.
pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(std::fs::read_to_string(path)?))
    } else {
        Ok(None)
    }
}

/// Copy a single file, creating the destination's parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    std::fs::copy(src, dst).map_err(|err| {
        SkpError::Io(std::io::Error::new(
            err.kind(),
            format!("copy {} -> {}: {err}", src.display(), dst.display()),
        ))
    })?;
    Ok(())
}

/// Recursively copy `src` into `dst`, skipping any entry whose file name
/// matches `exclude`. Excluded directories are not descended into.
///
/// Returns the relative paths of the files copied.
pub fn copy_tree<F>(src: &Path, dst: &Path, exclude: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let mut copied = Vec::new();
    if !src.is_dir() {
        return Ok(copied);
    }
    ensure_dir(dst)?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !exclude(&entry.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|err| {
            SkpError::Io(std::io::Error::other(format!(
                "walk {}: {err}",
                src.display()
            )))
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
            copied.push(to_slash(rel));
        }
    }

    Ok(copied)
}

/// Render a relative path with forward slashes for stable state keys.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `rel` stays inside whatever root it is joined onto.
pub fn is_safe_relative(rel: &str) -> bool {
    let path = Path::new(rel);
    !rel.trim().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
