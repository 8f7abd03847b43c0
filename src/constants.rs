//! Centralized constants for the checkout-locator crate
//!
//! Protocol-level values shared across modules. Tunables that operators may
//! want to change live in [`crate::config::defaults`] instead.

/// Geographic constants
pub mod geo {
    /// Half-width in degrees of the search bias viewbox around the map center
    pub const BIAS_DELTA_DEGREES: f64 = 0.5;

    /// Latitude bounds
    pub const MAX_LAT: f64 = 90.0;

    /// Longitude bounds
    pub const MAX_LNG: f64 = 180.0;
}

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "http://ip-api.com/json";

    /// Identifier sent upstream when none is configured (non-strict mode only)
    pub const DEFAULT_USER_AGENT: &str = concat!("checkout-locator/", env!("CARGO_PKG_VERSION"));
}

/// Forward search limits
pub mod search {
    /// Minimum trimmed query length the gateway accepts
    pub const MIN_GATEWAY_QUERY_CHARS: usize = 2;

    /// Result limit when the caller gives none (or an unparseable one)
    pub const DEFAULT_LIMIT: u32 = 5;

    /// Lower clamp for the result limit
    pub const MIN_LIMIT: u32 = 1;

    /// Upper clamp for the result limit
    pub const MAX_LIMIT: u32 = 10;
}

/// Cache settings
pub mod cache {
    /// IP location cache duration in seconds (1 hour)
    pub const IP_LOCATION_TTL_SECS: u64 = 3600;

    /// IP location cache file name
    pub const IP_LOCATION_CACHE_FILE: &str = "ip_location_cache.json";
}
