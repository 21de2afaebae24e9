//! Target page URL handling.
//!
//! The target's origin scopes the DevTools cache listing and the optional
//! same-origin entry filter.

use url::Url;

/// Error type for target URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL has no tuple origin: {0}")]
    OpaqueOrigin(String),
}

/// Canonicalize a target URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// ASCII serialization of the URL's origin, e.g. `https://example.com:8443`.
pub fn origin_of(url: &Url) -> Result<String, UrlError> {
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(UrlError::OpaqueOrigin(url.to_string()));
    }
    Ok(origin.ascii_serialization())
}

/// Whether `candidate` points at the same origin as `base`.
///
/// Relative URLs resolve against `base` and therefore always match.
pub fn same_origin(base: &Url, candidate: &str) -> bool {
    base.join(candidate)
        .map(|resolved| resolved.origin() == base.origin())
        .unwrap_or(false)
}
