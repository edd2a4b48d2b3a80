use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkpError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub install: InstallConfig,
    #[serde(default)]
    pub init: InitConfig,
}

impl Config {
    /// Layer defaults, the global file, the project file (or one explicit
    /// file), then `SKP_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SKP_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            let project = project_root.join(&config.paths.state_dir).join("config.toml");
            if let Some(patch) = Self::load_patch(&project)? {
                config.merge_patch(patch);
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("skp/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SkpError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SkpError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.paths {
            self.paths.merge(patch);
        }
        if let Some(patch) = patch.merge {
            self.merge.merge(patch);
        }
        if let Some(patch) = patch.install {
            self.install.merge(patch);
        }
        if let Some(patch) = patch.init {
            self.init.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("SKP_STATE_DIR") {
            self.paths.state_dir = PathBuf::from(value);
        }
        if let Some(value) = env_string("SKP_DEPENDENCY_MANIFEST") {
            self.paths.dependency_manifest = PathBuf::from(value);
        }
        if let Some(value) = env_string("SKP_ENV_FILE") {
            self.paths.env_file = PathBuf::from(value);
        }

        if let Some(value) = env_string("SKP_MERGE_DRIVER") {
            self.merge.driver = parse_driver(&value)?;
        }
        if let Some(value) = env_string("SKP_MERGE_GIT_BINARY") {
            self.merge.git_binary = value;
        }
        if let Some(value) = env_bool("SKP_MERGE_RESOLUTION_CACHE") {
            self.merge.resolution_cache = value;
        }

        if let Some(value) = env_bool("SKP_INSTALL_ENABLED") {
            self.install.enabled = value;
        }
        if let Some(values) = env_list("SKP_INSTALL_COMMAND") {
            self.install.command = values;
        }

        if let Some(values) = env_list("SKP_INIT_SNAPSHOT_ROOTS") {
            self.init.snapshot_roots = merge_unique(values, &self.init.snapshot_roots);
        }
        if let Some(values) = env_list("SKP_INIT_EXCLUDE") {
            self.init.exclude = merge_unique(values, &self.init.exclude);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Hidden engine directory, relative to the project root.
    #[serde(default)]
    pub state_dir: PathBuf,
    /// Dependency manifest touched by the dependency-map merge.
    #[serde(default)]
    pub dependency_manifest: PathBuf,
    /// Example environment file touched by the env merge.
    #[serde(default)]
    pub env_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".skp"),
            dependency_manifest: PathBuf::from("package.json"),
            env_file: PathBuf::from(".env.example"),
        }
    }
}

impl PathsConfig {
    fn merge(&mut self, patch: PathsPatch) {
        if let Some(value) = patch.state_dir {
            self.state_dir = value;
        }
        if let Some(value) = patch.dependency_manifest {
            self.dependency_manifest = value;
        }
        if let Some(value) = patch.env_file {
            self.env_file = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeDriverKind {
    /// In-process diff3.
    Builtin,
    /// `git merge-file` subprocess.
    Git,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_driver")]
    pub driver: MergeDriverKind,
    #[serde(default)]
    pub git_binary: String,
    #[serde(default)]
    pub ours_label: String,
    #[serde(default)]
    pub theirs_label: String,
    #[serde(default)]
    pub resolution_cache: bool,
}

const fn default_driver() -> MergeDriverKind {
    MergeDriverKind::Builtin
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            driver: MergeDriverKind::Builtin,
            git_binary: "git".to_string(),
            ours_label: "current".to_string(),
            theirs_label: "skill".to_string(),
            resolution_cache: true,
        }
    }
}

impl MergeConfig {
    fn merge(&mut self, patch: MergePatch) {
        if let Some(value) = patch.driver {
            self.driver = value;
        }
        if let Some(value) = patch.git_binary {
            self.git_binary = value;
        }
        if let Some(value) = patch.ours_label {
            self.ours_label = value;
        }
        if let Some(value) = patch.theirs_label {
            self.theirs_label = value;
        }
        if let Some(value) = patch.resolution_cache {
            self.resolution_cache = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub command: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["npm".to_string(), "install".to_string()],
        }
    }
}

impl InstallConfig {
    fn merge(&mut self, patch: InstallPatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(values) = patch.command {
            self.command = values;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Project directories snapshotted into the baseline tree by `init`.
    #[serde(default)]
    pub snapshot_roots: Vec<String>,
    /// Entry names skipped while snapshotting.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            snapshot_roots: vec!["src".to_string()],
            exclude: vec!["node_modules".to_string(), ".git".to_string()],
        }
    }
}

impl InitConfig {
    fn merge(&mut self, patch: InitPatch) {
        if let Some(values) = patch.snapshot_roots {
            self.snapshot_roots = values;
        }
        if let Some(values) = patch.exclude {
            self.exclude = merge_unique(values, &self.exclude);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub paths: Option<PathsPatch>,
    pub merge: Option<MergePatch>,
    pub install: Option<InstallPatch>,
    pub init: Option<InitPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PathsPatch {
    pub state_dir: Option<PathBuf>,
    pub dependency_manifest: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MergePatch {
    pub driver: Option<MergeDriverKind>,
    pub git_binary: Option<String>,
    pub ours_label: Option<String>,
    pub theirs_label: Option<String>,
    pub resolution_cache: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct InstallPatch {
    pub enabled: Option<bool>,
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct InitPatch {
    pub snapshot_roots: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

fn merge_unique(values: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.into_iter().chain(existing.iter().cloned()) {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn parse_driver(value: &str) -> Result<MergeDriverKind> {
    match value.to_lowercase().as_str() {
        "builtin" | "diff3" => Ok(MergeDriverKind::Builtin),
        "git" | "git-merge-file" => Ok(MergeDriverKind::Git),
        _ => Err(SkpError::Config(format!(
            "invalid merge driver {value} (expected builtin|git)"
        ))),
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|value| {
        value
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect()
    })
}
