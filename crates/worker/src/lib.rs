//! Offline asset-cache and request-interception worker.
//!
//! The worker sits between the application and the network. It precaches a
//! manifest into a versioned generation on install, drops superseded
//! generations on activate, answers every intercepted request (network-first
//! for navigations, cache-first for everything else) and turns push payloads
//! into local notifications.
//!
//! Hosts drive it through the [`ServiceWorker`] trait, one async method per
//! lifecycle event, and supply the [`Network`](swcache_client::Network),
//! [`Clients`] and [`Notifier`] seams.

pub mod host;
pub mod install;
pub mod lifecycle;
pub mod notify;
pub mod populate;
pub mod reap;
pub mod router;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use host::{Clients, Headless, Lifetime, Notification, Notifier, WindowClient};
pub use install::{InstallReport, PrecacheFailure};
pub use lifecycle::WorkerState;
pub use notify::{ActivationOutcome, NotificationOptions, NotificationPayload};
pub use reap::{GenerationStore, ReapReport};
pub use worker::{ServiceWorker, Worker, WorkerOptions};
