//! Canonical request identity used for lookup and storage.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::Request;

/// Canonical identity of a request: method, URL and the configured vary headers.
///
/// The URL has its fragment removed; the `url` crate already lowercases the
/// host and normalizes the path. Only headers named in the vary set take
/// part, so a precached entry and a later runtime request for the same URL
/// share a key unless the deployment opts into header variance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
    pub vary: String,
}

impl RequestKey {
    /// Build the key for an intercepted request.
    pub fn from_request(request: &Request, vary_headers: &[String]) -> Self {
        let mut vary: Vec<String> = vary_headers
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .filter_map(|name| request.headers.get(&name).map(|value| format!("{name}:{value}")))
            .collect();
        vary.sort();
        vary.dedup();

        Self { method: request.method.to_ascii_uppercase(), url: canonical_url(&request.url), vary: vary.join("\n") }
    }

    /// Key for a header-less GET, used for manifest entries and the fallback document.
    pub fn for_url(url: &Url) -> Self {
        Self { method: "GET".into(), url: canonical_url(url), vary: String::new() }
    }

    /// Storage identity: hex SHA-256 over method, URL and vary values.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url, &self.vary)
    }
}

fn canonical_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Compute the storage hash for a request identity.
pub fn compute_cache_key(method: &str, url: &str, vary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary.as_bytes());
    hex::encode(hasher.finalize())
}
