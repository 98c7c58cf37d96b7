//! HTTP fetch pipeline used by the worker.
//!
//! ### Network seam
//! - The worker only talks to the network through the [`Network`] trait, so
//!   hosts and tests can substitute their own transport.
//!
//! ### Safety Gates
//! - Explicit request timeout (default 10s); a hung connection fails instead
//!   of stalling a navigation forever.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! ### Response typing
//! - Same-origin answers are `basic`, approved cross-origin answers `cors`,
//!   `no-cors` cross-origin answers are masked as `opaque`.

pub mod classify;
pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};
use swcache_core::{Error, Headers, Request, RequestMode, Response, ResponseType};

pub use self::classify::{classify, same_origin};
pub use self::url::{UrlError, canonicalize, resolve};

/// Transport the worker fetches live responses through.
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue `request` and return the response as the application would see it.
    ///
    /// Any `Err` means no response could be produced (unreachable, timed out,
    /// blocked); HTTP error statuses are returned as ordinary responses.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the application is served from.
    pub origin: ::url::Url,

    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: ::url::Url) -> Self {
        Self {
            origin,
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(10_000),
            max_redirects: 5,
        }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn map_send_error(&self, url: &::url::Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{} after {}ms", url, self.config.timeout.as_millis()))
        } else {
            Error::Network(format!("{}: {}", url, err))
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let cross_origin = !same_origin(&self.config.origin, &request.url);

        if cross_origin && request.mode == RequestMode::SameOrigin {
            return Err(Error::CorsBlocked(format!("{} is not same-origin", request.url)));
        }

        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if cross_origin && request.mode == RequestMode::Cors {
            builder = builder.header(header::ORIGIN, self.config.origin.origin().ascii_serialization());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(&request.url, e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(&request.url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let response_type = classify(&self.config.origin, request.mode, &final_url, &headers);
        if response_type == ResponseType::Error {
            return Err(Error::CorsBlocked(format!("{} did not approve {}", final_url, self.config.origin)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            response_type.as_str(),
            fetch_ms,
            bytes.len()
        );

        let response = Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes,
            response_type,
        };

        Ok(if response_type == ResponseType::Opaque { response.into_opaque() } else { response })
    }
}
