//! The worker and its lifecycle event interface.
//!
//! A [`Worker`] is bound to one version tag for its whole life. The host
//! drives it through [`ServiceWorker`], one async method per platform event,
//! and awaits each before moving on. Background writes started by fetch
//! events are collected in the worker's [`Lifetime`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swcache_client::Network;
use swcache_core::{CacheDb, Error, Request, Response, WorkerConfig};
use url::Url;

use crate::host::{Clients, Lifetime, Notification, Notifier};
use crate::install::{self, InstallReport};
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::notify::{ActivationOutcome, Dispatcher, NotificationOptions};
use crate::populate::Populator;
use crate::reap::{self, ReapReport};
use crate::router::Router;

/// Everything a worker needs to know about its deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOptions {
    pub version: String,
    pub cache_prefix: String,
    pub origin: Url,
    pub manifest: Vec<Url>,
    pub offline_fallback: Url,
    pub app_root: Url,
    pub skip_waiting: bool,
    pub vary_headers: Vec<String>,
    pub notification: NotificationOptions,
}

impl WorkerOptions {
    /// Options for `version` at `origin` with an empty manifest.
    pub fn new(version: impl Into<String>, origin: Url) -> Self {
        let mut root = origin.clone();
        root.set_query(None);
        root.set_fragment(None);
        root.set_path("/");
        let mut fallback = root.clone();
        fallback.set_path("/index.html");

        Self {
            version: version.into(),
            cache_prefix: "chakki-cache".into(),
            origin,
            manifest: Vec::new(),
            offline_fallback: fallback,
            app_root: root,
            skip_waiting: true,
            vary_headers: Vec::new(),
            notification: NotificationOptions::default(),
        }
    }

    /// Resolve every path in `config` against its origin.
    pub fn from_config(config: &WorkerConfig) -> Result<Self, Error> {
        let origin = swcache_client::canonicalize(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve = |input: &str| swcache_client::resolve(&origin, input).map_err(|e| Error::InvalidUrl(e.to_string()));

        let manifest = config.manifest.iter().map(|entry| resolve(entry.as_str())).collect::<Result<Vec<_>, _>>()?;
        let offline_fallback = resolve(config.offline_fallback.as_str())?;
        let app_root = resolve(config.app_root.as_str())?;

        Ok(Self {
            version: config.version.clone(),
            cache_prefix: config.cache_prefix.clone(),
            origin,
            manifest,
            offline_fallback,
            app_root,
            skip_waiting: config.skip_waiting,
            vary_headers: config.vary_headers.iter().map(|h| h.to_ascii_lowercase()).collect(),
            notification: NotificationOptions {
                tag: config.notification_tag.clone(),
                icon: config.notification_icon.clone(),
                badge: config.notification_badge.clone(),
            },
        })
    }

    pub fn with_manifest(mut self, manifest: Vec<Url>) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    /// Generation tag owned by this version: `{cache_prefix}-{version}`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }
}

/// Platform events, one method each.
#[async_trait]
pub trait ServiceWorker: Send + Sync {
    /// Build this version's generation from the manifest.
    async fn on_install(&self) -> Result<InstallReport, Error>;

    /// Reap older generations and take control of open windows.
    async fn on_activate(&self) -> Result<ReapReport, Error>;

    /// Answer an intercepted request.
    async fn on_fetch(&self, request: &Request) -> Result<Response, Error>;

    /// Show a notification for a push message.
    async fn on_push(&self, data: Option<&[u8]>) -> Result<Notification, Error>;

    /// Focus or open a window for a clicked notification.
    async fn on_notification_activate(&self, tag: &str) -> Result<ActivationOutcome, Error>;
}

pub struct Worker {
    options: WorkerOptions,
    tag: String,
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    lifecycle: Lifecycle,
    lifetime: Lifetime,
    router: Router,
    dispatcher: Dispatcher,
}

impl Worker {
    pub fn new(
        options: WorkerOptions, db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn Clients>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let tag = options.cache_name();
        let lifetime = Lifetime::new();
        let populator = Populator::new(db.clone(), tag.clone(), options.vary_headers.clone(), lifetime.clone());
        let router = Router::new(
            db.clone(),
            network.clone(),
            tag.clone(),
            options.offline_fallback.clone(),
            options.vary_headers.clone(),
            populator,
        );
        let dispatcher =
            Dispatcher::new(notifier, clients.clone(), options.notification.clone(), options.app_root.clone());

        let lifecycle = Lifecycle::new(tag.clone());

        Self { options, tag, db, network, clients, lifecycle, lifetime, router, dispatcher }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    /// Wait for every background write started so far.
    pub async fn settle(&self) {
        self.lifetime.settle().await;
    }

    /// Host-triggered takeover: installed -> activating.
    ///
    /// A no-op when automatic takeover already moved the worker on.
    pub fn skip_waiting(&self) -> Result<(), Error> {
        match self.lifecycle.state() {
            WorkerState::Activating => Ok(()),
            _ => self.lifecycle.transition(WorkerState::Activating).map(|_| ()),
        }
    }
}

#[async_trait]
impl ServiceWorker for Worker {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        let state = self.lifecycle.state();
        if state != WorkerState::Installing {
            return Err(Error::InvalidState(format!("{}: install while {state}", self.tag)));
        }

        let report = install::precache(&self.db, self.network.as_ref(), &self.tag, &self.options.manifest).await?;

        self.lifecycle.transition(WorkerState::Installed)?;
        if self.options.skip_waiting {
            self.lifecycle.transition(WorkerState::Activating)?;
        }

        Ok(report)
    }

    async fn on_activate(&self) -> Result<ReapReport, Error> {
        match self.lifecycle.state() {
            WorkerState::Installed => {
                self.lifecycle.transition(WorkerState::Activating)?;
            }
            WorkerState::Activating => {}
            state => return Err(Error::InvalidState(format!("{}: activate while {state}", self.tag))),
        }

        let report = match reap::reap(&self.db, &self.tag).await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(generation = %self.tag, error = %err, "could not list generations; nothing reaped");
                ReapReport::default()
            }
        };

        if let Err(err) = self.clients.claim().await {
            tracing::warn!(generation = %self.tag, error = %err, "client claim failed");
        }

        self.lifecycle.transition(WorkerState::Activated)?;
        Ok(report)
    }

    async fn on_fetch(&self, request: &Request) -> Result<Response, Error> {
        self.router.handle(request).await
    }

    async fn on_push(&self, data: Option<&[u8]>) -> Result<Notification, Error> {
        self.dispatcher.push(data).await
    }

    async fn on_notification_activate(&self, tag: &str) -> Result<ActivationOutcome, Error> {
        self.dispatcher.activate(tag).await
    }
}
