//! Error types for checkout-locator

use thiserror::Error;

/// Main error type for checkout-locator operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed caller input; fatal to that call only
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Upstream provider answered 429
    #[error("Rate limited by upstream geocoder")]
    RateLimited,

    /// Upstream provider answered with a non-2xx status other than 429
    #[error("Upstream geocoder returned status {status}")]
    Upstream { status: u16 },

    /// Network, DNS or timeout failure before a response arrived
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Upstream body could not be decoded
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// Upstream had no address for the requested point
    #[error("No address found: {0}")]
    NotFound(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// Response token no longer current; never surfaced to users
    #[error("Stale response dropped")]
    Stale,

    #[error("Picker session closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl Error {
    /// Whether this error came back from (or on the way to) the upstream provider
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Error::RateLimited
                | Error::Upstream { .. }
                | Error::Transport(_)
                | Error::Decode(_)
                | Error::NotFound(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Error::Upstream {
                status: status.as_u16(),
            }
        } else {
            Error::Transport(err.to_string())
        }
    }
}

/// Result type alias for checkout-locator operations
pub type Result<T> = std::result::Result<T, Error>;
