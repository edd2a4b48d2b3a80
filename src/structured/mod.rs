//! Declarative edits merged by dedicated logic instead of textual diffing.

pub mod deps;
pub mod env;
pub mod install;

pub use deps::merge_dependencies;
pub use env::merge_env_additions;
pub use install::run_install;

use crate::config::Config;
use crate::error::Result;
use crate::skill::StructuredEdits;
use crate::storage::{ProjectLayout, StructuredOutcome};

/// Applies a skill's structured edits to one project.
pub struct StructuredMerger<'a> {
    layout: &'a ProjectLayout,
    config: &'a Config,
}

impl<'a> StructuredMerger<'a> {
    pub const fn new(layout: &'a ProjectLayout, config: &'a Config) -> Self {
        Self { layout, config }
    }

    /// Dependencies first, then env names; the install step only runs when
    /// the dependency merge added something.
    pub fn apply(&self, edits: &StructuredEdits) -> Result<StructuredOutcome> {
        let mut outcome = StructuredOutcome::default();

        if !edits.npm_dependencies.is_empty() {
            let manifest = self.layout.root().join(&self.config.paths.dependency_manifest);
            outcome.dependencies_added = merge_dependencies(&manifest, &edits.npm_dependencies)?;
        }

        if !edits.env_additions.is_empty() {
            let env_file = self.layout.root().join(&self.config.paths.env_file);
            outcome.env_added = merge_env_additions(&env_file, &edits.env_additions)?;
        }

        if !outcome.dependencies_added.is_empty() {
            outcome.install_ran = run_install(&self.config.install, self.layout.root())?;
        }

        Ok(outcome)
    }
}
