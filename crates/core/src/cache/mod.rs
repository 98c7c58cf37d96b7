//! SQLite-backed store for versioned cache generations.
//!
//! Each generation is a self-contained request/response store keyed by a
//! version tag. It supports:
//!
//! - Request keys hashed with SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Wholesale generation deletion (entries cascade)

pub mod connection;
pub mod generations;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::{Generation, StoredResponse};
pub use key::RequestKey;
