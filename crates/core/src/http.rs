//! HTTP-shaped request and response types exchanged with the host.
//!
//! These carry exactly what the worker needs to classify, key and store
//! traffic. Header names are always lowercase.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Header map with lowercase names.
pub type Headers = BTreeMap<String, String>;

/// How the application issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full-page load.
    Navigate,
    /// Must stay on the application's origin.
    SameOrigin,
    /// Cross-origin allowed when the server opts in.
    Cors,
    /// Cross-origin without opt-in; the answer is opaque.
    NoCors,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Headers,
    pub mode: RequestMode,
}

impl Request {
    /// A plain GET, the shape the precache installer issues.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, headers: Headers::new(), mode: RequestMode::NoCors }
    }

    /// A full-page navigation.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".into(), url, headers: Headers::new(), mode: RequestMode::Navigate }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Visibility of a response to the worker, as decided by the origin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin.
    Basic,
    /// Cross-origin with CORS approval.
    Cors,
    /// Cross-origin without approval; status and headers are hidden.
    Opaque,
    /// Synthesized network error.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "error" => Some(ResponseType::Error),
            _ => None,
        }
    }
}

/// A response delivered to the application.
///
/// The body is a shared immutable buffer: cloning a `Response` hands out a
/// second reader of the same bytes, which is how the runtime cache keeps a
/// copy without consuming what the caller receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            body: body.into(),
            response_type: ResponseType::Basic,
        }
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Mask a cross-origin answer: status 0, no headers, body kept for delivery.
    pub fn into_opaque(self) -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            headers: Headers::new(),
            body: self.body,
            response_type: ResponseType::Opaque,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.response_type == ResponseType::Opaque
    }

    /// Storage eligibility: a readable 200, or any opaque response.
    ///
    /// Opaque responses cannot be inspected, so they are accepted without
    /// looking at status.
    pub fn is_cacheable(&self) -> bool {
        match self.response_type {
            ResponseType::Opaque => true,
            ResponseType::Basic | ResponseType::Cors => self.status == 200,
            ResponseType::Error => false,
        }
    }
}
