//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Generation store with SQLite backend
//! - HTTP-shaped request and response types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, Generation, RequestKey, StoredResponse};
pub use config::{ConfigError, WorkerConfig};
pub use error::Error;
pub use http::{Headers, Request, RequestMode, Response, ResponseType};
