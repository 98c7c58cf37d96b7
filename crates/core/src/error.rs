//! Unified error types for swcache.
//!
//! Every message is prefixed with a stable code so hosts can match on it
//! without depending on the enum itself.

use tokio_rusqlite::rusqlite;

/// Unified error types for the worker core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network could not produce a response.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Cross-origin response rejected by the CORS check.
    #[error("CORS_BLOCKED: {0}")]
    CorsBlocked(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// The generation a write targeted does not exist (never opened or already reaped).
    #[error("GENERATION_MISSING: {0}")]
    GenerationMissing(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Lifecycle event arrived in a state that does not accept it.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// A host collaborator (window manager, notification center) failed.
    #[error("HOST_ERROR: {0}")]
    Host(String),
}

impl Error {
    /// Whether the error came from the network rather than from storage or the host.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_) | Error::CorsBlocked(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
