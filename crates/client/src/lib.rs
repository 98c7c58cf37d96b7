//! Network side of swcache.
//!
//! This crate provides the `Network` seam the worker fetches through, the
//! reqwest-backed implementation, URL resolution and response typing.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, canonicalize, classify, resolve};
