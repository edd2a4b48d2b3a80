//! Three-way merging of skill-modified files.

pub mod diff3;
pub mod driver;
pub mod engine;
pub mod rerere;

pub use diff3::{MarkerLabels, MergedText, has_conflict_markers};
pub use driver::{Diff3Driver, GitMergeFileDriver, MergeDriver, MergeOutcome, driver_from_config};
pub use engine::{FileMergeStatus, FileMerger, MergeReport};
pub use rerere::{ConflictInputs, ResolutionCache};
