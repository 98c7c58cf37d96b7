//! Seams to the hosting platform.
//!
//! The window manager and the notification center are reached through
//! [`Clients`] and [`Notifier`]. [`Lifetime`] is the "keep me alive until
//! this settles" contract for work that outlives the event that started it.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swcache_core::Error;
use tokio::task::JoinSet;
use url::Url;

/// An open application window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focusable: bool,
}

/// Application windows under the worker's control.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Make this worker the controller of every open window without a reload.
    async fn claim(&self) -> Result<(), Error>;

    /// Open application windows, including ones not yet controlled.
    async fn match_windows(&self) -> Result<Vec<WindowClient>, Error>;

    /// Bring a window to the front.
    async fn focus(&self, id: &str) -> Result<(), Error>;

    /// Open a new window at `url`.
    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}

/// A local notification as handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Dedup tag: showing a notification replaces any visible one with the same tag.
    pub tag: String,
}

/// Platform notification center.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: Notification) -> Result<(), Error>;

    async fn close(&self, tag: &str) -> Result<(), Error>;
}

/// Host with no window manager or notification center.
///
/// Used when the lifecycle runs outside a browser (deploy-time precache);
/// every side effect is logged instead of performed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

#[async_trait]
impl Clients for Headless {
    async fn claim(&self) -> Result<(), Error> {
        tracing::debug!("headless host: nothing to claim");
        Ok(())
    }

    async fn match_windows(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(Vec::new())
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        Err(Error::Host(format!("headless host has no window {id}")))
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(%url, "headless host: would open window");
        Ok(())
    }
}

#[async_trait]
impl Notifier for Headless {
    async fn show(&self, notification: Notification) -> Result<(), Error> {
        tracing::info!(tag = %notification.tag, title = %notification.title, "headless host: notification");
        Ok(())
    }

    async fn close(&self, _tag: &str) -> Result<(), Error> {
        Ok(())
    }
}

/// Background work the host must wait for before retiring the worker.
///
/// Cloning shares the same task set.
#[derive(Clone, Default)]
pub struct Lifetime {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` in the background and keep the worker alive until it finishes.
    ///
    /// Tasks that already finished are collected first, so a worker that is
    /// never settled does not accumulate them.
    pub fn wait_until<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        collect_finished(&mut tasks);
        tasks.spawn(task);
    }

    /// Number of tasks still running.
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        collect_finished(&mut tasks);
        tasks.len()
    }

    /// Wait for every registered task, including ones registered while waiting.
    pub async fn settle(&self) {
        loop {
            let mut batch = {
                let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *tasks)
            };
            if batch.is_empty() {
                return;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(err) = result {
                    tracing::warn!(error = %err, "background task did not complete");
                }
            }
        }
    }
}

fn collect_finished(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(err) = result {
            tracing::warn!(error = %err, "background task did not complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_lifetime_settles_all_tasks() {
        let lifetime = Lifetime::new();
        let done = Arc::new(AtomicUsize::new(0));

        for delay in [30u64, 10, 20] {
            let done = done.clone();
            lifetime.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(lifetime.pending(), 3);

        lifetime.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(lifetime.pending(), 0);
    }

    #[tokio::test]
    async fn test_lifetime_settles_nested_tasks() {
        let lifetime = Lifetime::new();
        let done = Arc::new(AtomicUsize::new(0));

        let inner_lifetime = lifetime.clone();
        let inner_done = done.clone();
        lifetime.wait_until(async move {
            inner_lifetime.wait_until(async move {
                inner_done.fetch_add(1, Ordering::SeqCst);
            });
        });

        lifetime.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_finished_tasks_collected_without_settle() {
        let lifetime = Lifetime::new();
        for _ in 0..50 {
            lifetime.wait_until(async {});
        }

        for _ in 0..100 {
            if lifetime.pending() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(lifetime.pending(), 0);

        lifetime.wait_until(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        assert_eq!(lifetime.pending(), 1);
    }

    #[tokio::test]
    async fn test_settle_empty_returns() {
        Lifetime::new().settle().await;
    }

    #[tokio::test]
    async fn test_headless_has_no_windows() {
        let host = Headless;
        assert!(host.match_windows().await.unwrap().is_empty());
        assert!(host.claim().await.is_ok());
        assert!(matches!(host.focus("w1").await, Err(Error::Host(_))));
    }
}
