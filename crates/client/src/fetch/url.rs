//! URL canonicalization and resolution for manifest entries and requests.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase the host
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    check_scheme(&parsed)?;

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a manifest entry or path against the application origin.
///
/// Absolute URLs (`https://cdn.example/lib.js`) are canonicalized as-is;
/// local paths (`/index.html`, `app.js`) are joined onto `base`.
pub fn resolve(base: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.contains("://") {
        return canonicalize(trimmed);
    }

    let mut joined = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    check_scheme(&joined)?;
    joined.set_fragment(None);

    Ok(joined)
}

fn check_scheme(url: &url::Url) -> Result<(), UrlError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("https://chakki.example").unwrap()
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://example.com?a=1&b=2").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_local_path() {
        let url = resolve(&origin(), "/index.html").unwrap();
        assert_eq!(url.as_str(), "https://chakki.example/index.html");
    }

    #[test]
    fn test_resolve_root() {
        let url = resolve(&origin(), "/").unwrap();
        assert_eq!(url.as_str(), "https://chakki.example/");
    }

    #[test]
    fn test_resolve_absolute_remote() {
        let url = resolve(&origin(), "https://cdn.jsdelivr.net/npm/chart.js#x").unwrap();
        assert_eq!(url.as_str(), "https://cdn.jsdelivr.net/npm/chart.js");
    }

    #[test]
    fn test_resolve_keeps_query() {
        let url = resolve(&origin(), "/app.js?v=3").unwrap();
        assert_eq!(url.query(), Some("v=3"));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), " "), Err(UrlError::Empty)));
    }
}
