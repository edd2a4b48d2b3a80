//! skp - Skill Patch engine
//!
//! Applies self-contained skill packages onto a project tree: files are
//! added, modified files are merged three ways against a recorded baseline,
//! declarative edits are merged into `package.json` and the env file, and
//! every run is a transaction that is either committed, left for manual
//! conflict resolution, or rolled back.

pub mod app;
pub mod apply;
pub mod cli;
pub mod config;
pub mod error;
pub mod merge;
pub mod skill;
pub mod storage;
pub mod structured;
pub mod utils;

pub use error::{Result, SkpError};
