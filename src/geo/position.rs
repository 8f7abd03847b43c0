//! Device geolocation with a high-then-low accuracy fallback chain
//!
//! The acquirer never talks to the geocoding gateway and never touches the
//! resolved address; it only produces a coordinate for the map to fly to.

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Requested accuracy for one positioning attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyProfile {
    /// Precise fix (GPS-grade); may be slow or denied
    High,
    /// Relaxed fix (network/IP-grade)
    Low,
}

/// A source of device position fixes
pub trait PositionSource: Send + Sync {
    fn current_position(
        &self,
        profile: AccuracyProfile,
    ) -> impl std::future::Future<Output = Result<Coordinate>> + Send;
}

/// Timeouts for each attempt of the chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquirerConfig {
    pub high_accuracy_timeout: Duration,
    pub low_accuracy_timeout: Duration,
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        use crate::config::defaults::{
            DEFAULT_HIGH_ACCURACY_TIMEOUT_SECS, DEFAULT_LOW_ACCURACY_TIMEOUT_SECS,
        };
        Self {
            high_accuracy_timeout: Duration::from_secs(DEFAULT_HIGH_ACCURACY_TIMEOUT_SECS),
            low_accuracy_timeout: Duration::from_secs(DEFAULT_LOW_ACCURACY_TIMEOUT_SECS),
        }
    }
}

/// Runs the fallback chain over a [`PositionSource`]
#[derive(Debug)]
pub struct GeolocationAcquirer<P> {
    source: P,
    config: AcquirerConfig,
}

impl<P: PositionSource> GeolocationAcquirer<P> {
    pub fn new(source: P, config: AcquirerConfig) -> Self {
        Self { source, config }
    }

    /// Acquire the current position
    ///
    /// Tries a high-accuracy fix first, then retries once with the relaxed
    /// profile. Fails with [`Error::LocationUnavailable`] if both fail.
    pub async fn acquire(&self) -> Result<Coordinate> {
        match self
            .attempt(AccuracyProfile::High, self.config.high_accuracy_timeout)
            .await
        {
            Ok(coord) => return Ok(coord),
            Err(e) => debug!(error = %e, "high-accuracy fix failed; retrying relaxed"),
        }

        let coord = self
            .attempt(AccuracyProfile::Low, self.config.low_accuracy_timeout)
            .await
            .map_err(|e| Error::LocationUnavailable(e.to_string()))?;
        Ok(coord)
    }

    /// Acquire the current position, or `fallback` if none can be had
    pub async fn acquire_or(&self, fallback: Coordinate) -> Coordinate {
        match self.acquire().await {
            Ok(coord) => coord,
            Err(e) => {
                warn!(error = %e, %fallback, "geolocation unavailable; using default center");
                fallback
            }
        }
    }

    async fn attempt(&self, profile: AccuracyProfile, limit: Duration) -> Result<Coordinate> {
        let coord = tokio::time::timeout(limit, self.source.current_position(profile))
            .await
            .map_err(|_| {
                Error::LocationUnavailable(format!("{:?} accuracy fix timed out", profile))
            })??;

        coord.validate()?;
        info!(?profile, lat = coord.lat, lng = coord.lng, "position acquired");
        Ok(coord)
    }
}

/// A position source that always reports the same fix (or none)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPositionSource {
    position: Option<Coordinate>,
}

impl FixedPositionSource {
    pub fn new(position: Coordinate) -> Self {
        Self {
            position: Some(position),
        }
    }

    /// A source with no fix, as when permission is denied
    pub fn unavailable() -> Self {
        Self { position: None }
    }
}

impl PositionSource for FixedPositionSource {
    async fn current_position(&self, _profile: AccuracyProfile) -> Result<Coordinate> {
        self.position
            .ok_or_else(|| Error::LocationUnavailable("permission denied".to_string()))
    }
}
