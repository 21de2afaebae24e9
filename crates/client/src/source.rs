//! The remote-control capability the collector reads caches through.
//!
//! Browsers expose Cache Storage over more than one surface (the DevTools
//! `CacheStorage` domain, scripts running inside the page). None of them is
//! authoritative, so the collector only sees this trait and the binary picks
//! an implementation from configuration.

use cachesnap_core::{CollectionError, RawCacheEntry};
use serde::Deserialize;

/// A cache container as discovered by a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRef {
    /// Surface-specific handle used for follow-up queries.
    pub id: String,
    /// Name shown in the snapshot.
    pub name: String,
}

impl CacheRef {
    /// A container addressed by its name alone.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { id: name.clone(), name }
    }
}

/// One page of an entry listing.
#[derive(Debug, Clone, Copy)]
pub struct EntryQuery {
    pub skip: usize,
    pub limit: usize,
}

/// Entries returned for one [`EntryQuery`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPage {
    pub entries: Vec<RawCacheEntry>,
    /// Total entries matching the query across all pages, when known.
    #[serde(default)]
    pub total: Option<usize>,
}

/// Read-only access to the Cache Storage of one navigated page.
///
/// Implementations own the session they query, so [`CacheSource::release`]
/// is how the session gets torn down.
#[async_trait::async_trait]
pub trait CacheSource: Send + Sync {
    /// Short surface name for logs.
    fn surface(&self) -> &'static str;

    /// List the containers visible to the page, in discovery order.
    async fn list_caches(&self) -> Result<Vec<CacheRef>, CollectionError>;

    /// List one page of entries of `cache`.
    async fn list_entries(&self, cache: &CacheRef, query: &EntryQuery) -> Result<EntryPage, CollectionError>;

    /// Release the underlying session. Must be safe to call more than once.
    async fn release(&self) -> Result<(), CollectionError> {
        Ok(())
    }
}
