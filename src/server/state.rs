//! Server shared state
//!
//! Holds configuration and the upstream gateway shared by all requests.

use crate::config::Config;
use crate::error::Result;
use crate::geo::nominatim::NominatimGateway;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Config,

    /// Upstream gateway; one HTTP client for every request
    pub gateway: NominatimGateway,
}

impl AppState {
    /// Create new application state
    ///
    /// Fails when the gateway settings are unusable (e.g. strict mode
    /// without a user agent).
    pub fn new(config: Config) -> Result<Self> {
        let gateway = NominatimGateway::new(config.gateway_config())?;
        Ok(Self { config, gateway })
    }
}
