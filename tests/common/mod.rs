//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use skp::Result;
use skp::apply::{ApplyResult, Orchestrator};
use skp::config::Config;
use skp::merge::Diff3Driver;
use skp::skill::{SkillManifest, StructuredEdits};
use skp::storage::{EngineState, InitReport, ProjectLayout, ProjectLock, StateStore, init_project};

/// A throwaway project with skill packages living next to it.
pub struct ProjectFixture {
    dir: TempDir,
    pub layout: ProjectLayout,
    pub config: Config,
}

impl ProjectFixture {
    /// Empty project with a `package.json` and `src/`; installs disabled.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join("project");
        fs::create_dir_all(root.join("src")).expect("create src");

        let mut config = Config::default();
        config.install.enabled = false;
        let layout = ProjectLayout::from_config(root, &config);

        let fixture = Self {
            dir,
            layout,
            config,
        };
        fixture.write("package.json", "{\n  \"name\": \"app\",\n  \"version\": \"1.0.0\"\n}\n");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.layout.live(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        fs::write(path, content).expect("write project file");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.layout.live(rel)).expect("read project file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.layout.live(rel).exists()
    }

    pub fn baseline(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.layout.baseline(rel)).ok()
    }

    pub fn init(&self) -> InitReport {
        init_project(&self.layout, &self.config).expect("init project")
    }

    pub fn state(&self) -> EngineState {
        StateStore::new(self.layout.state_file())
            .read()
            .expect("read state")
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::with_driver(
            self.layout.clone(),
            self.config.clone(),
            Box::new(Diff3Driver::default()),
        )
    }

    pub fn lock(&self) -> ProjectLock {
        ProjectLock::acquire(self.layout.state_dir()).expect("acquire lock")
    }

    pub fn apply(&self, skill_dir: &Path) -> Result<ApplyResult> {
        let lock = self.lock();
        self.orchestrator().apply(&lock, skill_dir)
    }

    /// Start a skill package stored outside the project tree.
    pub fn skill(&self, name: &str, version: &str) -> SkillBuilder {
        SkillBuilder::new(self.dir.path().join("skills").join(format!("{name}-{version}")), name, version)
    }
}

pub struct SkillBuilder {
    dir: PathBuf,
    manifest: SkillManifest,
    files: Vec<(PathBuf, String)>,
}

impl SkillBuilder {
    fn new(dir: PathBuf, name: &str, version: &str) -> Self {
        Self {
            dir,
            manifest: SkillManifest {
                skill: name.to_string(),
                version: version.to_string(),
                core_version: "^1.0.0".to_string(),
                description: format!("{name} test skill"),
                adds: Vec::new(),
                modifies: Vec::new(),
                structured: None,
                conflicts: Vec::new(),
                depends: Vec::new(),
                test: None,
            },
            files: Vec::new(),
        }
    }

    pub fn add(mut self, rel: &str, content: &str) -> Self {
        self.manifest.adds.push(rel.to_string());
        self.files.push((Path::new("add").join(rel), content.to_string()));
        self
    }

    pub fn modify(mut self, rel: &str, content: &str) -> Self {
        self.manifest.modifies.push(rel.to_string());
        self.files.push((Path::new("modify").join(rel), content.to_string()));
        self
    }

    /// Declare a modification without shipping its content.
    pub fn modify_declared_only(mut self, rel: &str) -> Self {
        self.manifest.modifies.push(rel.to_string());
        self
    }

    pub fn depends(mut self, name: &str) -> Self {
        self.manifest.depends.push(name.to_string());
        self
    }

    pub fn conflicts(mut self, name: &str) -> Self {
        self.manifest.conflicts.push(name.to_string());
        self
    }

    pub fn npm(mut self, name: &str, version: &str) -> Self {
        self.structured()
            .npm_dependencies
            .insert(name.to_string(), version.to_string());
        self
    }

    pub fn env(mut self, name: &str) -> Self {
        self.structured().env_additions.push(name.to_string());
        self
    }

    fn structured(&mut self) -> &mut StructuredEdits {
        self.manifest.structured.get_or_insert_with(|| StructuredEdits {
            npm_dependencies: BTreeMap::new(),
            env_additions: Vec::new(),
        })
    }

    /// Write the package to disk and return its directory.
    pub fn build(self) -> PathBuf {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).expect("clear skill dir");
        }
        fs::create_dir_all(&self.dir).expect("create skill dir");
        for (rel, content) in &self.files {
            let path = self.dir.join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
            fs::write(path, content).expect("write skill file");
        }
        let yaml = serde_yaml::to_string(&self.manifest).expect("serialize manifest");
        fs::write(self.dir.join("manifest.yaml"), yaml).expect("write manifest");
        self.dir
    }
}
