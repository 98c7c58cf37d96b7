//! swcache host entry point.
//!
//! Runs one install/activate cycle for the configured version outside a
//! browser: the manifest is precached into the generation store and stale
//! generations are reaped. Logging goes to stderr; a JSON summary of the
//! cycle is written to stdout.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{CacheDb, WorkerConfig};
use swcache_worker::{Headless, ServiceWorker, Worker, WorkerOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load()?;
    let options = WorkerOptions::from_config(&config)?;

    tracing::info!(generation = %options.cache_name(), db = %config.db_path.display(), "starting swcache cycle");

    let db = CacheDb::open(&config.db_path).await?;

    let mut fetch_config = FetchConfig::new(options.origin.clone());
    fetch_config.user_agent = config.user_agent.clone();
    fetch_config.max_bytes = config.max_bytes;
    fetch_config.timeout = config.fetch_timeout();
    let network = Arc::new(FetchClient::new(fetch_config)?);

    let host = Arc::new(Headless);
    let worker = Worker::new(options, db.clone(), network, host.clone(), host);

    let install = worker.on_install().await?;
    if !config.skip_waiting {
        worker.skip_waiting()?;
    }
    let reap = worker.on_activate().await?;
    worker.settle().await;

    let summary = json!({
        "generation": worker.tag(),
        "state": worker.state(),
        "install": install,
        "reap": reap,
        "generations": db.list_generations().await?,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
