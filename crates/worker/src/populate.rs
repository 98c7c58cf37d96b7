//! Runtime cache population.
//!
//! Network answers for cache misses are copied into the current generation
//! in the background. The caller gets its response immediately; the write
//! is registered with the worker's [`Lifetime`] so the host keeps the worker
//! alive until it lands.

use swcache_core::{CacheDb, Error, Request, RequestKey, Response};

use crate::host::Lifetime;

#[derive(Clone)]
pub struct Populator {
    db: CacheDb,
    tag: String,
    vary: Vec<String>,
    lifetime: Lifetime,
}

impl Populator {
    pub fn new(db: CacheDb, tag: impl Into<String>, vary: Vec<String>, lifetime: Lifetime) -> Self {
        Self { db, tag: tag.into(), vary, lifetime }
    }

    /// Schedule a copy of `response` under the key of `request`.
    ///
    /// Returns whether a write was scheduled. Non-GET requests and
    /// uncacheable responses are skipped. The response body is shared, not
    /// copied.
    pub fn populate(&self, request: &Request, response: &Response) -> bool {
        if !request.is_get() || !response.is_cacheable() {
            tracing::trace!(url = %request.url, status = response.status, "response not cached");
            return false;
        }

        let key = RequestKey::from_request(request, &self.vary);
        let copy = response.clone();
        let db = self.db.clone();
        let tag = self.tag.clone();

        self.lifetime.wait_until(async move {
            match db.put_entry(&tag, &key, &copy).await {
                Ok(()) => tracing::debug!(generation = %tag, url = %key.url, "runtime entry stored"),
                Err(Error::GenerationMissing(_)) => {
                    tracing::warn!(generation = %tag, url = %key.url, "generation reaped before write; dropped")
                }
                Err(err) => tracing::warn!(generation = %tag, url = %key.url, error = %err, "runtime cache write failed"),
            }
        });

        true
    }
}
