//! Precache installer.
//!
//! Builds the generation for the current version tag from the manifest.
//! Entries are fetched one at a time and each failure is isolated: an
//! unreachable third-party URL leaves a hole in the cache but never aborts
//! the install.

use std::collections::HashSet;

use serde::Serialize;
use swcache_client::Network;
use swcache_core::{CacheDb, Error, Request, RequestKey};
use url::Url;

/// A manifest entry that did not make it into the generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of one install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub tag: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

impl InstallReport {
    /// Whether every manifest entry was cached.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Create generation `tag` and fill it from `manifest`.
///
/// # Errors
///
/// Only failing to create the generation itself is fatal. Fetch and store
/// failures for individual entries are logged and listed in the report.
pub async fn precache(
    db: &CacheDb, network: &dyn Network, tag: &str, manifest: &[Url],
) -> Result<InstallReport, Error> {
    db.open_generation(tag).await?;

    let mut report = InstallReport { tag: tag.to_string(), cached: Vec::new(), failed: Vec::new() };
    let mut seen = HashSet::new();

    for url in manifest {
        let key = RequestKey::for_url(url);
        if !seen.insert(key.hash()) {
            continue;
        }

        match precache_entry(db, network, tag, url, &key).await {
            Ok(()) => {
                tracing::debug!(generation = %tag, %url, "precached");
                report.cached.push(key.url);
            }
            Err(err) => {
                tracing::warn!(generation = %tag, %url, error = %err, "precache entry failed; continuing");
                report.failed.push(PrecacheFailure { url: key.url, reason: err.to_string() });
            }
        }
    }

    tracing::info!(
        generation = %tag,
        cached = report.cached.len(),
        failed = report.failed.len(),
        "precache finished"
    );

    Ok(report)
}

async fn precache_entry(
    db: &CacheDb, network: &dyn Network, tag: &str, url: &Url, key: &RequestKey,
) -> Result<(), Error> {
    let response = network.fetch(&Request::get(url.clone())).await?;

    if !response.is_cacheable() {
        return Err(Error::InvalidInput(format!(
            "not cacheable: status {} ({})",
            response.status,
            response.response_type.as_str()
        )));
    }

    db.put_entry(tag, key, &response).await
}
