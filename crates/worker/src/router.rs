//! Request routing.
//!
//! Navigations go to the network first and fall back to the reserved
//! document in the current generation. Everything else is served
//! cache-first, with misses fetched live and handed to the [`Populator`].

use std::sync::Arc;

use swcache_client::Network;
use swcache_core::{CacheDb, Error, Request, RequestKey, Response};
use url::Url;

use crate::populate::Populator;

#[derive(Clone)]
pub struct Router {
    db: CacheDb,
    network: Arc<dyn Network>,
    tag: String,
    fallback: Url,
    vary: Vec<String>,
    populator: Populator,
}

impl Router {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, tag: impl Into<String>, fallback: Url, vary: Vec<String>,
        populator: Populator,
    ) -> Self {
        Self { db, network, tag: tag.into(), fallback, vary, populator }
    }

    /// Produce exactly one response for `request`.
    ///
    /// # Errors
    ///
    /// A failed navigation errors only when the fallback document is missing
    /// too; the original network error is returned in that case. A failed
    /// fetch for an uncached asset is returned unchanged.
    pub async fn handle(&self, request: &Request) -> Result<Response, Error> {
        if request.is_navigation() {
            self.network_first(request).await
        } else {
            self.cache_first(request).await
        }
    }

    async fn network_first(&self, request: &Request) -> Result<Response, Error> {
        let err = match self.network.fetch(request).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        tracing::info!(url = %request.url, error = %err, "navigation failed; trying offline fallback");

        match self.lookup(&RequestKey::for_url(&self.fallback)).await {
            Some(response) => Ok(response),
            None => {
                tracing::warn!(url = %request.url, fallback = %self.fallback, "offline fallback not cached");
                Err(err)
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Response, Error> {
        if request.is_get()
            && let Some(response) = self.lookup(&RequestKey::from_request(request, &self.vary)).await
        {
            tracing::debug!(generation = %self.tag, url = %request.url, "cache hit");
            return Ok(response);
        }

        tracing::debug!(generation = %self.tag, url = %request.url, method = %request.method, "cache miss");

        let response = self.network.fetch(request).await?;
        self.populator.populate(request, &response);
        Ok(response)
    }

    /// Read from the current generation. Storage errors count as a miss.
    async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        match self.db.match_entry(&self.tag, key).await {
            Ok(found) => found.map(|stored| stored.into_response()),
            Err(err) => {
                tracing::warn!(generation = %self.tag, url = %key.url, error = %err, "cache read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Lifetime;
    use crate::testing::{MockNetwork, url};

    const TAG: &str = "chakki-cache-v1";

    struct Fixture {
        db: CacheDb,
        network: Arc<MockNetwork>,
        lifetime: Lifetime,
        router: Router,
    }

    async fn fixture(network: MockNetwork) -> Fixture {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation(TAG).await.unwrap();
        let network = Arc::new(network);
        let lifetime = Lifetime::new();
        let populator = Populator::new(db.clone(), TAG, Vec::new(), lifetime.clone());
        let router = Router::new(db.clone(), network.clone(), TAG, url("/index.html"), Vec::new(), populator);
        Fixture { db, network, lifetime, router }
    }

    async fn seed(db: &CacheDb, path: &str, body: &'static str) {
        db.put_entry(TAG, &RequestKey::for_url(&url(path)), &Response::new(200, body)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let f = fixture(MockNetwork::new()).await;
        seed(&f.db, "/app.js", "cached").await;

        let response = f.router.handle(&Request::get(url("/app.js"))).await.unwrap();

        assert_eq!(response.body.as_ref(), b"cached");
        assert!(f.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_and_populates() {
        let f = fixture(MockNetwork::new().route(&url("/style.css"), Response::new(200, "body{}"))).await;

        let response = f.router.handle(&Request::get(url("/style.css"))).await.unwrap();
        assert_eq!(response.body.as_ref(), b"body{}");
        f.lifetime.settle().await;

        let again = f.router.handle(&Request::get(url("/style.css"))).await.unwrap();
        assert_eq!(again, response);
        assert_eq!(f.network.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cross_origin_opaque_miss_is_stored() {
        let cdn = Url::parse("https://cdn.example/lib.js").unwrap();
        let f = fixture(MockNetwork::new().route(&cdn, Response::new(200, "lib").into_opaque())).await;

        let response = f.router.handle(&Request::get(cdn.clone())).await.unwrap();
        assert!(response.is_opaque());
        assert_eq!(response.status, 0);
        f.lifetime.settle().await;

        let stored = f.db.match_entry(TAG, &RequestKey::for_url(&cdn)).await.unwrap().unwrap();
        assert!(stored.is_opaque());
        assert_eq!(stored.response.body.as_ref(), b"lib");

        let again = f.router.handle(&Request::get(cdn)).await.unwrap();
        assert!(again.is_opaque());
        assert_eq!(f.network.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_uncached_asset_failure_propagates() {
        let f = fixture(MockNetwork::new()).await;
        f.network.set_offline(true);

        let result = f.router.handle(&Request::get(url("/chart.js"))).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_non_200_passes_through_uncached() {
        let f = fixture(MockNetwork::new().route(&url("/gone.png"), Response::new(404, "missing"))).await;

        let response = f.router.handle(&Request::get(url("/gone.png"))).await.unwrap();
        assert_eq!(response.status, 404);
        f.lifetime.settle().await;

        assert!(f.db.entry_urls(TAG).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_prefers_network() {
        let f = fixture(MockNetwork::new().route(&url("/reports"), Response::new(200, "live"))).await;
        seed(&f.db, "/index.html", "shell").await;
        seed(&f.db, "/reports", "stale").await;

        let response = f.router.handle(&Request::navigate(url("/reports"))).await.unwrap();

        assert_eq!(response.body.as_ref(), b"live");
        assert_eq!(f.network.calls(), vec![url("/reports").to_string()]);
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_fallback() {
        let f = fixture(MockNetwork::new()).await;
        seed(&f.db, "/index.html", "shell").await;
        f.network.set_offline(true);

        let response = f.router.handle(&Request::navigate(url("/expenses"))).await.unwrap();

        assert_eq!(response.body.as_ref(), b"shell");
        assert_eq!(f.network.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_navigation_offline_without_fallback_errors() {
        let f = fixture(MockNetwork::new()).await;
        f.network.set_offline(true);

        let result = f.router.handle(&Request::navigate(url("/"))).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_navigation_not_written_to_cache() {
        let f = fixture(MockNetwork::new().route(&url("/dashboard"), Response::new(200, "page"))).await;

        f.router.handle(&Request::navigate(url("/dashboard"))).await.unwrap();
        f.lifetime.settle().await;

        assert!(f.db.entry_urls(TAG).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_bypasses_cache() {
        let f = fixture(MockNetwork::new().route(&url("/api/sync"), Response::new(200, "ok"))).await;
        seed(&f.db, "/api/sync", "cached").await;
        let mut request = Request::get(url("/api/sync"));
        request.method = "POST".into();

        let response = f.router.handle(&request).await.unwrap();
        f.lifetime.settle().await;

        assert_eq!(response.body.as_ref(), b"ok");
        assert_eq!(f.network.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_generation_is_a_miss() {
        let f = fixture(MockNetwork::new().route(&url("/app.js"), Response::new(200, "live"))).await;
        f.db.delete_generation(TAG).await.unwrap();

        let response = f.router.handle(&Request::get(url("/app.js"))).await.unwrap();
        f.lifetime.settle().await;

        assert_eq!(response.body.as_ref(), b"live");
        assert!(!f.db.has_generation(TAG).await.unwrap());
    }
}
