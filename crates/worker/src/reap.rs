//! Generation reaper.
//!
//! On activation every generation other than the current one is deleted
//! whole. A failed delete is logged and the rest are still reaped.

use async_trait::async_trait;
use serde::Serialize;
use swcache_core::{CacheDb, Error, Generation};

/// Outcome of one reap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// The part of the generation store the reaper needs.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn list_generations(&self) -> Result<Vec<Generation>, Error>;

    async fn delete_generation(&self, tag: &str) -> Result<bool, Error>;
}

#[async_trait]
impl GenerationStore for CacheDb {
    async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        CacheDb::list_generations(self).await
    }

    async fn delete_generation(&self, tag: &str) -> Result<bool, Error> {
        CacheDb::delete_generation(self, tag).await
    }
}

/// Delete every generation whose tag isn't `current`.
///
/// # Errors
///
/// Returns an error only if the generations cannot be listed.
pub async fn reap(store: &dyn GenerationStore, current: &str) -> Result<ReapReport, Error> {
    let mut report = ReapReport::default();

    for generation in store.list_generations().await? {
        let tag = generation.tag;
        if tag == current {
            report.kept.push(tag);
            continue;
        }

        match store.delete_generation(&tag).await {
            Ok(_) => {
                tracing::info!(generation = %tag, entries = generation.entries, "deleted stale generation");
                report.deleted.push(tag);
            }
            Err(err) => {
                tracing::warn!(generation = %tag, error = %err, "failed to delete stale generation; continuing");
                report.failed.push(tag);
            }
        }
    }

    Ok(report)
}
