//! Unified error types for cachesnap.
//!
//! `CollectionError` is the single failure kind of a collection run. `Error`
//! wraps it together with the failures of the surrounding glue (output,
//! configuration).

use crate::config::ConfigError;

/// Failure of a cache collection run.
///
/// Every variant carries enough context to tell which container or entry
/// was being read when the remote call failed.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// The page's cache containers could not be enumerated.
    #[error("LIST_CACHES_FAILED: {0}")]
    ListCaches(String),

    /// The entries of one container could not be enumerated.
    #[error("LIST_ENTRIES_FAILED: cache {cache:?}: {reason}")]
    ListEntries { cache: String, reason: String },

    /// A single entry could not be read or normalized.
    #[error("ENTRY_FAILED: cache {cache:?}, entry {entry}: {reason}")]
    Entry { cache: String, entry: String, reason: String },

    /// The session lacks the capability needed by the selected surface.
    #[error("UNSUPPORTED: {0}")]
    Unsupported(String),

    /// Acquiring, driving or releasing the browser session failed.
    #[error("SESSION_ERROR: {0}")]
    Session(String),

    /// The whole collection exceeded the caller's deadline.
    #[error("TIMEOUT: collection did not finish within {0}ms")]
    Timeout(u64),
}

impl CollectionError {
    pub fn list_entries(cache: &str, reason: impl ToString) -> Self {
        CollectionError::ListEntries { cache: cache.to_string(), reason: reason.to_string() }
    }

    pub fn entry(cache: &str, entry: impl ToString, reason: impl ToString) -> Self {
        CollectionError::Entry { cache: cache.to_string(), entry: entry.to_string(), reason: reason.to_string() }
    }
}

/// Top-level error for a cachesnap run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing the snapshot file failed.
    #[error("OUTPUT_ERROR: {0}")]
    Output(#[from] std::io::Error),

    #[error("SERIALIZE_ERROR: {0}")]
    Serialize(#[from] serde_json::Error),
}
