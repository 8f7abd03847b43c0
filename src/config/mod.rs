//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/checkout-locator/config.toml
//!
//! A few deployment-sensitive values can be overridden from the environment
//! (see [`defaults::ENV_USER_AGENT`] and friends).

pub mod defaults;

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::nominatim::GatewayConfig;
use crate::geo::position::AcquirerConfig;
use crate::picker::PickerOptions;
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream geocoder settings
    #[serde(default)]
    pub geocoder: GeocoderConfig,

    /// Map picker timing and behavior
    #[serde(default)]
    pub picker: PickerConfig,

    /// Device geolocation settings
    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Upstream geocoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Base URL of the Nominatim-compatible provider
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Client identifier sent as User-Agent on every upstream call
    #[serde(default)]
    pub user_agent: String,

    /// Contact address forwarded as `email=` (optional)
    #[serde(default)]
    pub contact_email: String,

    /// Locale hint forwarded as `accept-language=` (optional)
    #[serde(default)]
    pub accept_language: String,

    /// Default country restriction for forward search
    #[serde(default = "default_country_codes")]
    pub country_codes: String,

    /// Refuse to start without an explicit user agent
    #[serde(default)]
    pub strict: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

/// Map picker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Settle debounce after movement ends, in milliseconds
    #[serde(default = "default_settle_debounce")]
    pub settle_debounce_ms: u64,

    /// Search debounce after the last keystroke, in milliseconds
    #[serde(default = "default_search_debounce")]
    pub search_debounce_ms: u64,

    /// Minimum query length before autocomplete searches
    #[serde(default = "default_min_search_chars")]
    pub min_search_chars: usize,

    /// Abort superseded upstream requests instead of only ignoring their results
    #[serde(default = "default_true")]
    pub abort_stale_requests: bool,

    /// Fallback map center latitude
    #[serde(default = "default_center_lat")]
    pub default_lat: f64,

    /// Fallback map center longitude
    #[serde(default = "default_center_lng")]
    pub default_lng: f64,
}

/// Device geolocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// Timeout for the high-accuracy attempt, in seconds
    #[serde(default = "default_high_accuracy_timeout")]
    pub high_accuracy_timeout_secs: u64,

    /// Timeout for the relaxed retry, in seconds
    #[serde(default = "default_low_accuracy_timeout")]
    pub low_accuracy_timeout_secs: u64,

    /// Cache IP-based fixes on disk
    #[serde(default = "default_true")]
    pub cache_ip_location: bool,
}

// Default value functions for serde
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}
fn default_country_codes() -> String {
    DEFAULT_COUNTRY_CODES.to_string()
}
fn default_upstream_timeout() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}
fn default_settle_debounce() -> u64 {
    DEFAULT_SETTLE_DEBOUNCE_MS
}
fn default_search_debounce() -> u64 {
    DEFAULT_SEARCH_DEBOUNCE_MS
}
fn default_min_search_chars() -> usize {
    DEFAULT_MIN_SEARCH_CHARS
}
fn default_center_lat() -> f64 {
    DEFAULT_CENTER_LAT
}
fn default_center_lng() -> f64 {
    DEFAULT_CENTER_LNG
}
fn default_high_accuracy_timeout() -> u64 {
    DEFAULT_HIGH_ACCURACY_TIMEOUT_SECS
}
fn default_low_accuracy_timeout() -> u64 {
    DEFAULT_LOW_ACCURACY_TIMEOUT_SECS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            user_agent: String::new(),
            contact_email: String::new(),
            accept_language: String::new(),
            country_codes: default_country_codes(),
            strict: false,
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            settle_debounce_ms: default_settle_debounce(),
            search_debounce_ms: default_search_debounce(),
            min_search_chars: default_min_search_chars(),
            abort_stale_requests: true,
            default_lat: default_center_lat(),
            default_lng: default_center_lng(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy_timeout_secs: default_high_accuracy_timeout(),
            low_accuracy_timeout_secs: default_low_accuracy_timeout(),
            cache_ip_location: true,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path, then apply environment overrides
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config: Config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read config file: {}", e))
            })?;

            toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse config file: {}", e))
            })?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Apply overrides looked up by environment variable name
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_USER_AGENT) {
            self.geocoder.user_agent = v;
        }
        if let Some(v) = get(ENV_CONTACT_EMAIL) {
            self.geocoder.contact_email = v;
        }
        if let Some(v) = get(ENV_UPSTREAM_URL) {
            self.geocoder.base_url = v;
        }
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["geocoder", "base_url"] => Some(self.geocoder.base_url.clone()),
            ["geocoder", "user_agent"] => Some(self.geocoder.user_agent.clone()),
            ["geocoder", "contact_email"] => Some(self.geocoder.contact_email.clone()),
            ["geocoder", "accept_language"] => Some(self.geocoder.accept_language.clone()),
            ["geocoder", "country_codes"] => Some(self.geocoder.country_codes.clone()),
            ["geocoder", "strict"] => Some(self.geocoder.strict.to_string()),
            ["geocoder", "timeout_secs"] => Some(self.geocoder.timeout_secs.to_string()),

            ["picker", "settle_debounce_ms"] => Some(self.picker.settle_debounce_ms.to_string()),
            ["picker", "search_debounce_ms"] => Some(self.picker.search_debounce_ms.to_string()),
            ["picker", "min_search_chars"] => Some(self.picker.min_search_chars.to_string()),
            ["picker", "abort_stale_requests"] => {
                Some(self.picker.abort_stale_requests.to_string())
            }
            ["picker", "default_lat"] => Some(self.picker.default_lat.to_string()),
            ["picker", "default_lng"] => Some(self.picker.default_lng.to_string()),

            ["geolocation", "high_accuracy_timeout_secs"] => {
                Some(self.geolocation.high_accuracy_timeout_secs.to_string())
            }
            ["geolocation", "low_accuracy_timeout_secs"] => {
                Some(self.geolocation.low_accuracy_timeout_secs.to_string())
            }
            ["geolocation", "cache_ip_location"] => {
                Some(self.geolocation.cache_ip_location.to_string())
            }

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse_value(key, value)?,

            ["geocoder", "base_url"] => self.geocoder.base_url = value.to_string(),
            ["geocoder", "user_agent"] => self.geocoder.user_agent = value.to_string(),
            ["geocoder", "contact_email"] => self.geocoder.contact_email = value.to_string(),
            ["geocoder", "accept_language"] => self.geocoder.accept_language = value.to_string(),
            ["geocoder", "country_codes"] => self.geocoder.country_codes = value.to_string(),
            ["geocoder", "strict"] => self.geocoder.strict = parse_value(key, value)?,
            ["geocoder", "timeout_secs"] => self.geocoder.timeout_secs = parse_value(key, value)?,

            ["picker", "settle_debounce_ms"] => {
                self.picker.settle_debounce_ms = parse_value(key, value)?
            }
            ["picker", "search_debounce_ms"] => {
                self.picker.search_debounce_ms = parse_value(key, value)?
            }
            ["picker", "min_search_chars"] => {
                self.picker.min_search_chars = parse_value(key, value)?
            }
            ["picker", "abort_stale_requests"] => {
                self.picker.abort_stale_requests = parse_value(key, value)?
            }
            ["picker", "default_lat"] => {
                let lat: f64 = parse_value(key, value)?;
                Coordinate::new(lat, self.picker.default_lng)
                    .validate()
                    .map_err(|e| Error::Config(e.to_string()))?;
                self.picker.default_lat = lat;
            }
            ["picker", "default_lng"] => {
                let lng: f64 = parse_value(key, value)?;
                Coordinate::new(self.picker.default_lat, lng)
                    .validate()
                    .map_err(|e| Error::Config(e.to_string()))?;
                self.picker.default_lng = lng;
            }

            ["geolocation", "high_accuracy_timeout_secs"] => {
                self.geolocation.high_accuracy_timeout_secs = parse_value(key, value)?
            }
            ["geolocation", "low_accuracy_timeout_secs"] => {
                self.geolocation.low_accuracy_timeout_secs = parse_value(key, value)?
            }
            ["geolocation", "cache_ip_location"] => {
                self.geolocation.cache_ip_location = parse_value(key, value)?
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "server.host",
            "server.port",
            "geocoder.base_url",
            "geocoder.user_agent",
            "geocoder.contact_email",
            "geocoder.accept_language",
            "geocoder.country_codes",
            "geocoder.strict",
            "geocoder.timeout_secs",
            "picker.settle_debounce_ms",
            "picker.search_debounce_ms",
            "picker.min_search_chars",
            "picker.abort_stale_requests",
            "picker.default_lat",
            "picker.default_lng",
            "geolocation.high_accuracy_timeout_secs",
            "geolocation.low_accuracy_timeout_secs",
            "geolocation.cache_ip_location",
        ]
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Fallback map center used when no position is known
    pub fn default_center(&self) -> Coordinate {
        Coordinate::new(self.picker.default_lat, self.picker.default_lng)
    }

    /// Settings for the upstream gateway
    pub fn gateway_config(&self) -> GatewayConfig {
        let optional = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        GatewayConfig {
            base_url: self.geocoder.base_url.trim_end_matches('/').to_string(),
            user_agent: optional(&self.geocoder.user_agent),
            contact_email: optional(&self.geocoder.contact_email),
            accept_language: optional(&self.geocoder.accept_language),
            country_codes: self.geocoder.country_codes.trim().to_string(),
            strict: self.geocoder.strict,
            timeout: Duration::from_secs(self.geocoder.timeout_secs),
        }
    }

    /// Settings for the geolocation fallback chain
    pub fn acquirer_config(&self) -> AcquirerConfig {
        AcquirerConfig {
            high_accuracy_timeout: Duration::from_secs(self.geolocation.high_accuracy_timeout_secs),
            low_accuracy_timeout: Duration::from_secs(self.geolocation.low_accuracy_timeout_secs),
        }
    }

    /// Settings for one picker session
    pub fn picker_options(&self) -> PickerOptions {
        PickerOptions {
            settle_debounce: Duration::from_millis(self.picker.settle_debounce_ms),
            search_debounce: Duration::from_millis(self.picker.search_debounce_ms),
            min_search_chars: self.picker.min_search_chars,
            abort_stale_requests: self.picker.abort_stale_requests,
            default_center: self.default_center(),
            initial: None,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}
