//! Push notification dispatch.
//!
//! Push payloads become local notifications sharing one dedup tag, so a new
//! push replaces the visible notification instead of stacking. Activating a
//! notification brings an open window to the front, else launches one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use swcache_core::Error;
use url::Url;

use crate::host::{Clients, Notification, Notifier};

const DEFAULT_TITLE: &str = "New Update";

/// Decoded push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.into()
}

impl Default for NotificationPayload {
    fn default() -> Self {
        Self { title: default_title(), body: String::new() }
    }
}

impl NotificationPayload {
    /// Decode `{title?, body?}`. Anything that isn't such an object is shown
    /// as plain text under the default title.
    pub fn decode(data: Option<&[u8]>) -> Self {
        let Some(data) = data else {
            return Self::default();
        };

        match serde_json::from_slice::<Self>(data) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(error = %err, "push payload is not JSON; using raw text");
                Self { title: default_title(), body: String::from_utf8_lossy(data).into_owned() }
            }
        }
    }
}

/// Fixed presentation shared by every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    pub tag: String,
    pub icon: String,
    pub badge: String,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            tag: "chakki-notification".into(),
            icon: "/icons/icon-192x192.png".into(),
            badge: "/icons/icon-72x72.png".into(),
        }
    }
}

/// What a notification activation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ActivationOutcome {
    Focused { id: String },
    Opened { url: String },
}

#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn Clients>,
    options: NotificationOptions,
    app_root: Url,
}

impl Dispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>, clients: Arc<dyn Clients>, options: NotificationOptions, app_root: Url,
    ) -> Self {
        Self { notifier, clients, options, app_root }
    }

    /// Show the notification for a push event.
    pub async fn push(&self, data: Option<&[u8]>) -> Result<Notification, Error> {
        let payload = NotificationPayload::decode(data);
        let notification = Notification {
            title: payload.title,
            body: payload.body,
            icon: self.options.icon.clone(),
            badge: self.options.badge.clone(),
            tag: self.options.tag.clone(),
        };

        self.notifier.show(notification.clone()).await?;
        tracing::info!(tag = %notification.tag, title = %notification.title, "notification shown");
        Ok(notification)
    }

    /// Handle a click on the notification tagged `tag`.
    pub async fn activate(&self, tag: &str) -> Result<ActivationOutcome, Error> {
        if let Err(err) = self.notifier.close(tag).await {
            tracing::warn!(%tag, error = %err, "failed to close notification");
        }

        let windows = self.clients.match_windows().await?;
        if let Some(window) = windows.into_iter().find(|w| w.focusable) {
            match self.clients.focus(&window.id).await {
                Ok(()) => {
                    tracing::debug!(id = %window.id, url = %window.url, "focused existing window");
                    return Ok(ActivationOutcome::Focused { id: window.id });
                }
                Err(err) => tracing::warn!(id = %window.id, error = %err, "focus failed; opening a new window"),
            }
        }

        self.clients.open_window(&self.app_root).await?;
        tracing::debug!(url = %self.app_root, "opened new window");
        Ok(ActivationOutcome::Opened { url: self.app_root.to_string() })
    }
}
