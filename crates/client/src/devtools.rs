//! Cache Storage through the DevTools `CacheStorage` domain.
//!
//! Containers are listed for the target page's security origin and entries
//! are paged with `skipCount`/`pageSize`. The protocol does not report a
//! response size, so it is read from `content-length`, or measured from the
//! cached body when `measure_bodies` is on.

use std::collections::BTreeMap;

use cachesnap_core::{CollectionError, RawCacheEntry};
use chromiumoxide::cdp::browser_protocol::cache_storage::{
    CacheId, DataEntry, Header, RequestCacheNamesParams, RequestCachedResponseParams, RequestEntriesParams,
};

use crate::session::BrowserSession;
use crate::source::{CacheRef, CacheSource, EntryPage, EntryQuery};

/// [`CacheSource`] backed by the DevTools `CacheStorage` domain.
pub struct DevToolsSource {
    session: BrowserSession,
    origin: String,
    measure_bodies: bool,
}

impl DevToolsSource {
    /// Read caches of `origin` (e.g. `https://ui.perfetto.dev`) through `session`.
    pub fn new(session: BrowserSession, origin: impl Into<String>) -> Self {
        Self { session, origin: origin.into(), measure_bodies: false }
    }

    /// Fetch each cached body to report its exact size.
    pub fn measure_bodies(mut self, measure: bool) -> Self {
        self.measure_bodies = measure;
        self
    }

    async fn body_size(&self, cache: &CacheRef, entry: &DataEntry) -> Result<u64, CollectionError> {
        let params = RequestCachedResponseParams::builder()
            .cache_id(CacheId::new(cache.id.clone()))
            .request_url(entry.request_url.clone())
            .request_headers(entry.request_headers.clone())
            .build()
            .map_err(|e| CollectionError::entry(&cache.name, &entry.request_url, e))?;

        let response = self.session.page().execute(params).await.map_err(|e| {
            classify("CacheStorage.requestCachedResponse", e.to_string(), |reason| {
                CollectionError::entry(&cache.name, &entry.request_url, reason)
            })
        })?;

        let body: &str = response.result.response.body.as_ref();
        Ok(decoded_len(body))
    }
}

#[async_trait::async_trait]
impl CacheSource for DevToolsSource {
    fn surface(&self) -> &'static str {
        "devtools"
    }

    async fn list_caches(&self) -> Result<Vec<CacheRef>, CollectionError> {
        let params = RequestCacheNamesParams::builder()
            .security_origin(self.origin.clone())
            .build();

        let response = self
            .session
            .page()
            .execute(params)
            .await
            .map_err(|e| classify("CacheStorage.requestCacheNames", e.to_string(), CollectionError::ListCaches))?;

        Ok(response
            .result
            .caches
            .into_iter()
            .map(|cache| CacheRef { id: cache.cache_id.inner().clone(), name: cache.cache_name })
            .collect())
    }

    async fn list_entries(&self, cache: &CacheRef, query: &EntryQuery) -> Result<EntryPage, CollectionError> {
        let params = RequestEntriesParams::builder()
            .cache_id(CacheId::new(cache.id.clone()))
            .skip_count(query.skip as i64)
            .page_size(query.limit as i64)
            .build()
            .map_err(|e| CollectionError::list_entries(&cache.name, e))?;

        let response = self.session.page().execute(params).await.map_err(|e| {
            classify("CacheStorage.requestEntries", e.to_string(), |reason| {
                CollectionError::list_entries(&cache.name, reason)
            })
        })?;

        let returns = response.result;
        let total = returns.return_count.max(0.0) as usize;

        let mut entries = Vec::with_capacity(returns.cache_data_entries.len());
        for entry in returns.cache_data_entries {
            let measured = if self.measure_bodies { Some(self.body_size(cache, &entry).await?) } else { None };
            entries.push(raw_entry(entry, measured));
        }

        Ok(EntryPage { entries, total: Some(total) })
    }

    async fn release(&self) -> Result<(), CollectionError> {
        self.session.release().await
    }
}

fn raw_entry(entry: DataEntry, measured: Option<u64>) -> RawCacheEntry {
    let headers = merge_headers(header_pairs(&entry.response_headers));
    from_parts(entry.request_url, entry.response_status, entry.response_status_text, headers, measured)
}

fn header_pairs(headers: &[Header]) -> impl Iterator<Item = (&str, &str)> {
    headers.iter().map(|h| (h.name.as_str(), h.value.as_str()))
}

fn from_parts(
    url: String, status: i64, status_text: String, headers: BTreeMap<String, String>, measured: Option<u64>,
) -> RawCacheEntry {
    let content_type = headers.get("content-type").cloned();
    let size = measured.or_else(|| headers.get("content-length").and_then(|v| v.trim().parse().ok()));

    RawCacheEntry {
        url: Some(url),
        content_type,
        size,
        headers: Some(headers),
        status: u16::try_from(status).ok(),
        status_text: Some(status_text),
    }
}

/// Lower-case header names and join repeated headers with `", "`.
fn merge_headers<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in pairs {
        merged
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    merged
}

/// Byte length of a base64 payload without decoding it.
fn decoded_len(encoded: &str) -> u64 {
    let n = encoded.trim_end_matches('=').len() as u64;
    n / 4 * 3
        + match n % 4 {
            2 => 1,
            3 => 2,
            _ => 0,
        }
}

/// Map a failed protocol command, telling a missing domain apart from a
/// failed call.
fn classify(method: &str, message: String, wrap: impl FnOnce(String) -> CollectionError) -> CollectionError {
    if message.contains("wasn't found") {
        CollectionError::Unsupported(format!("{method} is not available in this browser: {message}"))
    } else {
        wrap(format!("{method}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_headers_lowercases_and_joins() {
        let merged = merge_headers([
            ("Content-Type", "text/javascript"),
            ("Vary", "Accept-Encoding"),
            ("vary", "Origin"),
        ]);

        assert_eq!(merged.get("content-type").map(String::as_str), Some("text/javascript"));
        assert_eq!(merged.get("vary").map(String::as_str), Some("Accept-Encoding, Origin"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_from_parts_reads_type_and_length() {
        let headers = merge_headers([("content-type", "application/wasm"), ("content-length", " 4096 ")]);

        let raw = from_parts("https://ui.perfetto.dev/engine.wasm".into(), 200, "OK".into(), headers, None);

        assert_eq!(raw.content_type.as_deref(), Some("application/wasm"));
        assert_eq!(raw.size, Some(4096));
        assert_eq!(raw.status, Some(200));
        assert_eq!(raw.status_text.as_deref(), Some("OK"));
    }

    #[test]
    fn test_from_parts_measured_size_wins() {
        let headers = merge_headers([("content-length", "10")]);
        let raw = from_parts("/a.js".into(), 200, String::new(), headers, Some(12));
        assert_eq!(raw.size, Some(12));
    }

    #[test]
    fn test_from_parts_without_headers_normalizes_to_defaults() {
        let raw = from_parts("/a.js".into(), 0, String::new(), BTreeMap::new(), None);
        let entry = raw.normalize("v1", 0).unwrap();

        assert_eq!(entry.content_type, "unknown");
        assert_eq!(entry.size_bytes, 0);
        assert!(entry.headers.is_empty());
        assert_eq!(entry.status, Some(0));
        assert_eq!(entry.status_text, None);
    }

    #[test]
    fn test_from_parts_ignores_bad_length() {
        let headers = merge_headers([("content-length", "lots")]);
        let raw = from_parts("/a.js".into(), 200, "OK".into(), headers, None);
        assert_eq!(raw.size, None);
    }

    #[test]
    fn test_decoded_len() {
        assert_eq!(decoded_len(""), 0);
        assert_eq!(decoded_len("aGk="), 2);
        assert_eq!(decoded_len("YWJj"), 3);
        assert_eq!(decoded_len("aGVsbG8="), 5);
        assert_eq!(decoded_len("aGVsbG8"), 5);
    }

    #[test]
    fn test_classify_missing_domain() {
        let err = classify(
            "CacheStorage.requestCacheNames",
            "'CacheStorage.requestCacheNames' wasn't found".into(),
            CollectionError::ListCaches,
        );
        assert!(matches!(err, CollectionError::Unsupported(_)));
    }

    #[test]
    fn test_classify_call_failure_keeps_context() {
        let err = classify("CacheStorage.requestEntries", "No cache found".into(), |reason| {
            CollectionError::list_entries("v1", reason)
        });
        assert!(matches!(err, CollectionError::ListEntries { cache, reason } if cache == "v1" && reason.contains("No cache found")));
    }
}
