//! Recording fakes for the host and network seams.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use swcache_client::Network;
use swcache_core::{Error, Request, Response};
use url::Url;

use crate::host::{Clients, Notification, Notifier, WindowClient};

pub const ORIGIN: &str = "https://chakki.example";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Network that answers from a fixed route table and records every call.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &Url, response: Response) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), response);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }
        self.routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("{}: unreachable", request.url)))
    }
}

/// Window manager fake that records focus/open calls.
#[derive(Default)]
pub struct RecordingClients {
    pub windows: Mutex<Vec<WindowClient>>,
    pub focused: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
    pub claims: AtomicUsize,
    /// Make `focus` fail, as when the window closed after it was matched.
    pub fail_focus: AtomicBool,
}

impl RecordingClients {
    pub fn with_windows(windows: Vec<WindowClient>) -> Self {
        Self { windows: Mutex::new(windows), ..Default::default() }
    }
}

#[async_trait]
impl Clients for RecordingClients {
    async fn claim(&self) -> Result<(), Error> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn match_windows(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.windows.lock().unwrap().clone())
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        if self.fail_focus.load(Ordering::SeqCst) {
            return Err(Error::Host(format!("window {id} is gone")));
        }
        self.focused.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Notification center fake with platform tag semantics: same tag replaces.
#[derive(Default)]
pub struct RecordingNotifier {
    pub visible: Mutex<Vec<Notification>>,
    pub closed: Mutex<Vec<String>>,
    pub shown: AtomicUsize,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: Notification) -> Result<(), Error> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        let mut visible = self.visible.lock().unwrap();
        visible.retain(|n| n.tag != notification.tag);
        visible.push(notification);
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<(), Error> {
        self.visible.lock().unwrap().retain(|n| n.tag != tag);
        self.closed.lock().unwrap().push(tag.to_string());
        Ok(())
    }
}
