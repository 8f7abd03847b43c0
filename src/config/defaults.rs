//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7878;

/// Default upstream geocoder base URL
pub const DEFAULT_UPSTREAM_URL: &str = crate::constants::api::NOMINATIM_URL;

/// Default country restriction for forward search (ISO 3166-1 alpha-2)
pub const DEFAULT_COUNTRY_CODES: &str = "de";

/// Default upstream request timeout in seconds
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Quiet period after movement ends before a reverse lookup is issued
pub const DEFAULT_SETTLE_DEBOUNCE_MS: u64 = 350;

/// Quiet period after the last keystroke before a forward search is issued
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;

/// Minimum trimmed query length before autocomplete searches
pub const DEFAULT_MIN_SEARCH_CHARS: usize = 3;

/// Map center used when no position can be acquired (Berlin, Alexanderplatz)
pub const DEFAULT_CENTER_LAT: f64 = 52.5219;
pub const DEFAULT_CENTER_LNG: f64 = 13.4132;

/// Timeout for the high-accuracy geolocation attempt
pub const DEFAULT_HIGH_ACCURACY_TIMEOUT_SECS: u64 = 5;

/// Timeout for the relaxed geolocation retry
pub const DEFAULT_LOW_ACCURACY_TIMEOUT_SECS: u64 = 10;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "checkout-locator";

/// Environment overrides, applied after the config file is read
pub const ENV_USER_AGENT: &str = "CHECKOUT_LOCATOR_USER_AGENT";
pub const ENV_CONTACT_EMAIL: &str = "CHECKOUT_LOCATOR_CONTACT_EMAIL";
pub const ENV_UPSTREAM_URL: &str = "CHECKOUT_LOCATOR_UPSTREAM_URL";
