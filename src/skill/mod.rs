//! Skill packages: manifest parsing and pre-flight checks.

pub mod checks;
pub mod manifest;

pub use checks::{CheckOutcome, check_conflicts, check_dependencies};
pub use manifest::{SkillManifest, StructuredEdits};
