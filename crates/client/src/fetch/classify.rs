//! Response typing by origin.
//!
//! Decides whether a response is same-origin, CORS-approved, opaque, or
//! rejected, from the application origin, the request mode, the URL the
//! response finally came from and the response headers.

use swcache_core::{Headers, RequestMode, ResponseType};
use url::Url;

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Type a response as the application would see it.
///
/// `url` is where the response came from after redirects, not where the
/// request was sent. [`ResponseType::Error`] means the cross-origin check
/// failed and the response must not reach the application.
pub fn classify(origin: &Url, mode: RequestMode, url: &Url, headers: &Headers) -> ResponseType {
    if same_origin(origin, url) {
        return ResponseType::Basic;
    }

    match mode {
        RequestMode::NoCors => ResponseType::Opaque,
        RequestMode::Navigate => ResponseType::Basic,
        RequestMode::Cors if cors_allows(origin, headers) => ResponseType::Cors,
        RequestMode::Cors | RequestMode::SameOrigin => ResponseType::Error,
    }
}

fn cors_allows(origin: &Url, headers: &Headers) -> bool {
    match headers.get("access-control-allow-origin") {
        Some(allowed) => {
            let allowed = allowed.trim();
            allowed == "*" || allowed == origin.origin().ascii_serialization()
        }
        None => false,
    }
}
