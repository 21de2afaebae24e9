//! Snapshot data model and entry normalization.
//!
//! A surface reports [`RawCacheEntry`] values with whatever fields it could
//! read. Normalization applies the defaults (`"unknown"` type, `0` size,
//! empty headers) and produces the [`CacheEntry`] records that end up in the
//! output file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CollectionError;

/// Content type recorded when the surface could not determine one.
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// One cached request/response pair after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,

    #[serde(rename = "type")]
    pub content_type: String,

    #[serde(rename = "size")]
    pub size_bytes: u64,

    /// Response headers, ordered by name.
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(default, rename = "statusText", skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
}

/// A named cache and the entries read from it, in surface order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheContainer {
    pub name: String,
    pub entries: Vec<CacheEntry>,
}

/// Everything collected from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub caches: Vec<CacheContainer>,
}

impl Snapshot {
    /// Append a container in discovery order.
    ///
    /// Containers without entries are dropped; returns whether `container`
    /// was kept.
    pub fn push(&mut self, container: CacheContainer) -> bool {
        if container.entries.is_empty() {
            return false;
        }
        self.caches.push(container);
        true
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            containers: self.caches.len(),
            entries: self.caches.iter().map(|c| c.entries.len()).sum(),
            total_size: self.caches.iter().flat_map(|c| &c.entries).map(|e| e.size_bytes).sum(),
        }
    }
}

/// Totals over a snapshot, reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub containers: usize,
    pub entries: usize,
    pub total_size: u64,
}

/// An entry as reported by a surface, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCacheEntry {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default, rename = "type")]
    pub content_type: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub status: Option<u16>,

    #[serde(default, rename = "statusText")]
    pub status_text: Option<String>,
}

impl RawCacheEntry {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), ..Default::default() }
    }

    /// Apply defaults and produce the output record.
    ///
    /// `cache` and `index` only feed the error context. An entry without a
    /// request URL cannot be attributed to anything and fails the run.
    pub fn normalize(self, cache: &str, index: usize) -> Result<CacheEntry, CollectionError> {
        let url = match self.url {
            Some(url) if !url.trim().is_empty() => url,
            _ => return Err(CollectionError::entry(cache, format!("#{index}"), "entry has no request URL")),
        };

        let content_type = self
            .content_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string());

        Ok(CacheEntry {
            url,
            content_type,
            size_bytes: self.size.unwrap_or(0),
            headers: self.headers.unwrap_or_default(),
            status: self.status,
            status_text: self.status_text.filter(|s| !s.is_empty()),
        })
    }
}

/// Human-readable byte count with one decimal, B through GB.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{size:.1} {}", UNITS[unit])
}
