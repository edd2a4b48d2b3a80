//! Append-only merge of environment variable names into an env file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::utils::read_optional;

static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z_][A-Z0-9_]*)=").expect("valid regex"));

const BLOCK_HEADER: &str = "# Added by skill";

/// Variable names defined in `content`.
pub fn existing_names(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| ENV_NAME.captures(line.trim_start()))
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Append `NAME=` for every name not already defined. Existing lines are
/// never touched; nothing is written when there is nothing new. Returns the
/// names appended.
pub fn merge_env_additions(path: &Path, additions: &[String]) -> Result<Vec<String>> {
    let content = read_optional(path)?.unwrap_or_default();
    let existing = existing_names(&content);

    let mut seen = HashSet::new();
    let added: Vec<String> = additions
        .iter()
        .filter(|name| !existing.contains(name.as_str()) && seen.insert(name.as_str()))
        .cloned()
        .collect();
    if added.is_empty() {
        return Ok(added);
    }

    let mut output = content;
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    if !output.is_empty() {
        output.push('\n');
    }
    output.push_str(BLOCK_HEADER);
    output.push('\n');
    for name in &added {
        output.push_str(name);
        output.push_str("=\n");
    }
    fs::write(path, output)?;

    tracing::info!(names = ?added, path = %path.display(), "env variables added");
    Ok(added)
}
