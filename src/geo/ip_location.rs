//! IP-based position source
//!
//! Uses ip-api.com with file-based caching. IP geolocation is coarse by
//! nature, so this source only serves the relaxed accuracy profile and
//! declines high-accuracy requests immediately.

use crate::constants::api::IP_API_URL;
use crate::constants::cache::{IP_LOCATION_CACHE_FILE, IP_LOCATION_TTL_SECS};
use crate::config::defaults::APP_DIR_NAME;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::position::{AccuracyProfile, PositionSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

/// IP position source with caching
#[derive(Debug)]
pub struct IpPositionSource {
    client: reqwest::Client,
    endpoint: String,
    cache_path: Option<PathBuf>,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

/// Cached fix
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPosition {
    position: Coordinate,
    timestamp: u64,
}

impl IpPositionSource {
    /// Create a source with the default cache path
    pub fn new() -> Self {
        let cache_path = dirs::cache_dir().map(|p| p.join(APP_DIR_NAME).join(IP_LOCATION_CACHE_FILE));

        Self {
            client: reqwest::Client::new(),
            endpoint: IP_API_URL.to_string(),
            cache_path,
        }
    }

    /// Create a source with a specific cache path
    pub fn with_cache_path(cache_path: PathBuf) -> Self {
        Self {
            cache_path: Some(cache_path),
            ..Self::without_cache()
        }
    }

    /// Create a source without caching
    pub fn without_cache() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: IP_API_URL.to_string(),
            cache_path: None,
        }
    }

    /// Point at a different ip-api compatible endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Get the current position based on IP address
    pub async fn locate(&self) -> Result<Coordinate> {
        if let Some(cached) = self.load_cache() {
            debug!("using cached IP position");
            return Ok(cached);
        }

        let position = self.fetch_position().await?;
        self.save_cache(position);
        Ok(position)
    }

    async fn fetch_position(&self) -> Result<Coordinate> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::LocationUnavailable(format!("IP location request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::LocationUnavailable(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response.json().await.map_err(|e| {
            Error::LocationUnavailable(format!("Failed to parse IP location response: {}", e))
        })?;

        if data.status != "success" {
            return Err(Error::LocationUnavailable(format!(
                "IP location lookup failed: {}",
                data.message.unwrap_or_else(|| data.status.clone())
            )));
        }

        match (data.lat, data.lon) {
            (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
            _ => Err(Error::LocationUnavailable(
                "No coordinates in IP location response".to_string(),
            )),
        }
    }

    /// Load cached position if still fresh
    fn load_cache(&self) -> Option<Coordinate> {
        let cache_path = self.cache_path.as_ref()?;
        let content = fs::read_to_string(cache_path).ok()?;
        let cached: CachedPosition = serde_json::from_str(&content).ok()?;

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()?
            .as_secs();

        (now.saturating_sub(cached.timestamp) < IP_LOCATION_TTL_SECS).then_some(cached.position)
    }

    fn save_cache(&self, position: Coordinate) {
        let Some(cache_path) = &self.cache_path else {
            return;
        };

        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let cached = CachedPosition { position, timestamp };
        if let Ok(content) = serde_json::to_string_pretty(&cached) {
            let _ = fs::write(cache_path, content);
        }
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        if let Some(cache_path) = &self.cache_path {
            let _ = fs::remove_file(cache_path);
        }
    }
}

impl Default for IpPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for IpPositionSource {
    async fn current_position(&self, profile: AccuracyProfile) -> Result<Coordinate> {
        match profile {
            AccuracyProfile::High => Err(Error::LocationUnavailable(
                "IP geolocation cannot provide a high-accuracy fix".to_string(),
            )),
            AccuracyProfile::Low => self.locate().await,
        }
    }
}
