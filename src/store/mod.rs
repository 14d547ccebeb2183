//! Persistent document storage and version management.
//!
//! Documents are plain JSON files under a data directory, written atomically
//! (serialize to a temp file in the same directory, then rename). Writes for
//! one category are serialized by an in-process lock plus an advisory file
//! lock (see [`flock`]) and guarded by an on-disk compare-and-swap predicate,
//! so "read current max version, append, flip pointer" is one atomic unit
//! even when several processes share the data directory.

use thiserror::Error;

pub mod catalog;
pub mod flock;
pub mod rate_lists;
pub mod versions;

pub use catalog::CatalogStore;
pub use rate_lists::RateListStore;
pub use versions::VersionManager;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The on-disk document changed between read and write. The caller may
    /// retry its read-modify-write cycle.
    #[error("Concurrent modification of rate list '{category}'")]
    VersionConflict { category: String },

    #[error("Already exists: {what}")]
    Conflict { what: String },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

/// Reduce a category or service name to a stable filename slug.
#[must_use]
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
