//! Storage layer for skp
//!
//! Everything the engine persists lives under one hidden directory in the
//! project: the state file, baseline snapshots, the transaction backup and
//! the lock file.

pub mod backup;
pub mod init;
pub mod layout;
pub mod lock;
pub mod pending;
pub mod state;

pub use backup::{BackupIndex, BackupManager};
pub use init::{InitReport, init_project};
pub use layout::ProjectLayout;
pub use lock::{LockInfo, ProjectLock};
pub use pending::PendingApplication;
pub use state::{AppliedSkill, AppliedSummary, EngineState, StateStore, StructuredOutcome};
