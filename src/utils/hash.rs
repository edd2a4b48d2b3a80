//! Content fingerprints for tracked files.
//!
//! SHA-256 over raw bytes, lowercase hex. No newline normalisation: the same
//! bytes hash the same on every platform.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, SkpError};

/// Hash a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash the current content of a file.
pub fn hash_file(path: &Path) -> Result<String> {
    let data = fs::read(path).map_err(|err| {
        SkpError::Io(std::io::Error::new(
            err.kind(),
            format!("read {}: {err}", path.display()),
        ))
    })?;
    Ok(hash_bytes(&data))
}

/// Hash several byte slices as one key, each part terminated by a NUL so that
/// `("ab", "c")` and `("a", "bc")` never collide.
pub fn hash_parts(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
