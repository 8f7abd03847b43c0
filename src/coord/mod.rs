//! Coordinates and derived geometry
//!
//! This module handles:
//! - The immutable `Coordinate` value type and its range validation
//! - The soft-bias viewbox attached to forward searches

use crate::constants::geo::{BIAS_DELTA_DEGREES, MAX_LAT, MAX_LNG};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic coordinate (latitude, longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Create new coordinates
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validate that coordinates are finite and within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(Error::InvalidParams(format!(
                "Coordinates must be finite, got ({}, {})",
                self.lat, self.lng
            )));
        }
        if !(-MAX_LAT..=MAX_LAT).contains(&self.lat) {
            return Err(Error::InvalidParams(format!(
                "Latitude {} is out of range [-90, 90]",
                self.lat
            )));
        }
        if !(-MAX_LNG..=MAX_LNG).contains(&self.lng) {
            return Err(Error::InvalidParams(format!(
                "Longitude {} is out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Viewbox of ±0.5° around this point, used to bias (not filter) search results
    pub fn bias_viewbox(&self) -> ViewBox {
        ViewBox {
            left: self.lng - BIAS_DELTA_DEGREES,
            top: self.lat + BIAS_DELTA_DEGREES,
            right: self.lng + BIAS_DELTA_DEGREES,
            bottom: self.lat - BIAS_DELTA_DEGREES,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

impl std::str::FromStr for Coordinate {
    type Err = String;

    /// Parse "lat,lng" (whitespace around either part is ignored)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("Expected \"lat,lng\", got: {}", s))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("Invalid latitude: {}", lat.trim()))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| format!("Invalid longitude: {}", lng.trim()))?;
        let coord = Coordinate::new(lat, lng);
        coord.validate().map_err(|e| e.to_string())?;
        Ok(coord)
    }
}

/// A bounding box in Nominatim order: left (min lng), top (max lat), right, bottom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ViewBox {
    /// Render as the `viewbox` query value: "left,top,right,bottom"
    pub fn to_query_value(&self) -> String {
        format!("{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_validate_ranges() {
        assert!(Coordinate::new(52.52, 13.405).validate().is_ok());
        assert!(Coordinate::new(90.0, 180.0).validate().is_ok());
        assert!(Coordinate::new(-90.0, -180.0).validate().is_ok());
        assert!(Coordinate::new(200.0, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -180.5).validate().is_err());
    }

    #[test]
    fn test_validate_non_finite() {
        let err = Coordinate::new(f64::NAN, 0.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_bias_viewbox() {
        let vb = Coordinate::new(52.52, 13.405).bias_viewbox();
        assert_relative_eq!(vb.left, 12.905, epsilon = 1e-9);
        assert_relative_eq!(vb.right, 13.905, epsilon = 1e-9);
        assert_relative_eq!(vb.top, 53.02, epsilon = 1e-9);
        assert_relative_eq!(vb.bottom, 52.02, epsilon = 1e-9);
    }

    #[test]
    fn test_viewbox_query_value() {
        let vb = Coordinate::new(10.0, 20.0).bias_viewbox();
        assert_eq!(vb.to_query_value(), "19.5,10.5,20.5,9.5");
    }

    #[test]
    fn test_parse() {
        let c: Coordinate = "52.52, 13.405".parse().unwrap();
        assert_relative_eq!(c.lat, 52.52);
        assert_relative_eq!(c.lng, 13.405);
        assert!("52.52".parse::<Coordinate>().is_err());
        assert!("abc,1".parse::<Coordinate>().is_err());
        assert!("95,1".parse::<Coordinate>().is_err());
    }
}
