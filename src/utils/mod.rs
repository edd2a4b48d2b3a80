//! Utility functions and helpers.

pub mod fs;
pub mod hash;

// Re-exports for convenience
pub use fs::*;
pub use hash::{hash_bytes, hash_file};
