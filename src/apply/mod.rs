//! Skill application: drift detection and the transactional orchestrator.

pub mod drift;
pub mod orchestrator;

pub use drift::{TrackedChange, TrackedDrift, detect_drift, tracked_drift};
pub use orchestrator::{
    AbortReport, AppliedEntry, ApplyPhase, ApplyResult, Orchestrator, StatusReport,
};
