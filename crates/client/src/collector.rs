//! Cache snapshot collection.
//!
//! Walks every container a [`CacheSource`] reports, pages through its
//! entries, normalizes them and assembles a [`Snapshot`]:
//!
//! 1. List container names visible to the page's storage context.
//! 2. Page through each container's entries (`page_size` per call).
//! 3. Normalize entries, applying defaults for missing type/size/headers.
//! 4. Drop containers left without entries.
//! 5. Keep containers in discovery order.
//!
//! Any failing lookup aborts the run; there are no partial snapshots.

use std::time::Duration;

use cachesnap_core::{CacheContainer, CacheEntry, CollectionError, Snapshot};
use url::Url;

use crate::source::{CacheRef, CacheSource, EntryQuery};
use crate::target::same_origin;

/// Default entries requested per listing call.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Options controlling one collection run.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Entries requested per listing call (default: 100)
    pub page_size: usize,

    /// Keep only entries whose full URL contains this substring, ignoring
    /// case. Applied here rather than by the surface, so every surface
    /// filters the same way.
    pub path_filter: Option<String>,

    /// Keep only entries on this page's origin.
    pub same_origin: Option<Url>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, path_filter: None, same_origin: None }
    }
}

/// Collects a [`Snapshot`] from any [`CacheSource`].
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshotCollector {
    options: CollectOptions,
}

impl CacheSnapshotCollector {
    pub fn new(options: CollectOptions) -> Self {
        Self { options }
    }

    /// Read every container and entry from `source`.
    pub async fn collect<S>(&self, source: &S) -> Result<Snapshot, CollectionError>
    where
        S: CacheSource + ?Sized,
    {
        let caches = source.list_caches().await?;
        tracing::debug!(surface = source.surface(), containers = caches.len(), "listed cache containers");

        let mut snapshot = Snapshot::default();
        for cache in caches {
            let entries = self.collect_container(source, &cache).await?;
            let count = entries.len();

            if snapshot.push(CacheContainer { name: cache.name.clone(), entries }) {
                tracing::debug!(cache = %cache.name, entries = count, "collected cache container");
            } else {
                tracing::debug!(cache = %cache.name, "skipping empty cache container");
            }
        }

        Ok(snapshot)
    }

    /// Run [`collect`](Self::collect) under `timeout`, then release the source.
    ///
    /// The source is released on every path, including failures and timeouts.
    /// A release failure is logged and does not replace the collection
    /// outcome.
    pub async fn collect_and_release<S>(&self, source: &S, timeout: Duration) -> Result<Snapshot, CollectionError>
    where
        S: CacheSource + ?Sized,
    {
        let outcome = match tokio::time::timeout(timeout, self.collect(source)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CollectionError::Timeout(timeout.as_millis() as u64)),
        };

        if let Err(e) = source.release().await {
            tracing::warn!(surface = source.surface(), "failed to release session: {e}");
        }

        outcome
    }

    async fn collect_container<S>(&self, source: &S, cache: &CacheRef) -> Result<Vec<CacheEntry>, CollectionError>
    where
        S: CacheSource + ?Sized,
    {
        let limit = self.options.page_size.max(1);
        let mut entries = Vec::new();
        let mut skip = 0;

        loop {
            let query = EntryQuery { skip, limit };
            let page = source.list_entries(cache, &query).await?;
            let fetched = page.entries.len();

            tracing::debug!(cache = %cache.name, skip, fetched, total = ?page.total, "listed entry page");

            for (offset, raw) in page.entries.into_iter().enumerate() {
                let entry = raw.normalize(&cache.name, skip + offset)?;
                if self.keeps(&entry) {
                    entries.push(entry);
                }
            }

            skip += fetched;

            let exhausted = match page.total {
                Some(total) => fetched == 0 || skip >= total,
                None => fetched < limit,
            };
            if exhausted {
                break;
            }
        }

        Ok(entries)
    }

    fn keeps(&self, entry: &CacheEntry) -> bool {
        if let Some(filter) = self.options.path_filter.as_deref()
            && !entry.url.to_lowercase().contains(&filter.to_lowercase())
        {
            return false;
        }

        match &self.options.same_origin {
            Some(base) => same_origin(base, &entry.url),
            None => true,
        }
    }
}
