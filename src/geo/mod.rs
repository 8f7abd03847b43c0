//! Geocoding module
//!
//! Provides reverse/forward geocoding through the upstream gateway and
//! device geolocation with a fallback chain.

pub mod ip_location;
pub mod nominatim;
pub mod position;

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A postal address resolved from a map point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    /// The point that was resolved (the map center, not the provider's snapped point)
    pub coordinate: Coordinate,
    /// Human-readable address line
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Provider payload as received
    pub raw: serde_json::Value,
}

/// Address block of a Nominatim reverse response (`addressdetails=1`)
#[derive(Debug, Default, Deserialize)]
struct AddressDetails {
    road: Option<String>,
    pedestrian: Option<String>,
    house_number: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    suburb: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReversePayload {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<AddressDetails>,
    #[serde(default)]
    error: Option<String>,
}

impl ResolvedAddress {
    /// Parse a reverse-lookup payload for the point `at`
    ///
    /// The display name falls back to the top-level `name`, then to the
    /// finer-grained fields, then to the coordinate itself.
    pub fn from_payload(at: Coordinate, raw: serde_json::Value) -> Result<Self> {
        let payload: ReversePayload = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Decode(format!("Unexpected reverse payload: {}", e)))?;

        if let Some(error) = payload.error {
            return Err(Error::NotFound(error));
        }

        let details = payload.address.unwrap_or_default();
        let road = details.road.or(details.pedestrian);
        let street = match (road, details.house_number) {
            (Some(road), Some(number)) => Some(format!("{} {}", road, number)),
            (road, _) => road,
        };
        let city = details
            .city
            .or(details.town)
            .or(details.village)
            .or(details.municipality)
            .or(details.suburb);
        let postal_code = details.postcode;
        let country = details.country;

        let display_name = non_empty(payload.display_name)
            .or_else(|| non_empty(payload.name))
            .or_else(|| {
                let joined = [&street, &postal_code, &city, &country]
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                non_empty(Some(joined))
            })
            .unwrap_or_else(|| at.to_string());

        Ok(Self {
            coordinate: at,
            display_name,
            street,
            city,
            postal_code,
            country,
            raw,
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// A forward-search suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub id: String,
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Caller options for forward lookup; the gateway normalizes them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum results, clamped to [1, 10]; default 5
    pub limit: Option<u32>,
    /// Country restriction; defaults to the configured country
    pub country_codes: Option<String>,
    /// Point to softly bias results toward
    pub bias: Option<Coordinate>,
}

impl SearchOptions {
    pub fn biased_to(center: Coordinate) -> Self {
        Self {
            bias: Some(center),
            ..Self::default()
        }
    }
}

/// Trait for geocoding backends
pub trait Geocoder: Send + Sync {
    /// Resolve a coordinate to an address
    fn reverse_lookup(
        &self,
        at: Coordinate,
    ) -> impl std::future::Future<Output = Result<ResolvedAddress>> + Send;

    /// Resolve free text to candidate locations
    fn forward_lookup(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> impl std::future::Future<Output = Result<Vec<SearchCandidate>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn berlin() -> Coordinate {
        Coordinate::new(52.5219, 13.4132)
    }

    #[test]
    fn test_parse_full_address() {
        let raw = json!({
            "place_id": 12345,
            "lat": "52.52186",
            "lon": "13.41321",
            "display_name": "Alexanderplatz 1, 10178 Berlin, Deutschland",
            "address": {
                "road": "Alexanderplatz",
                "house_number": "1",
                "city": "Berlin",
                "postcode": "10178",
                "country": "Deutschland"
            }
        });

        let addr = ResolvedAddress::from_payload(berlin(), raw.clone()).unwrap();
        assert_eq!(addr.display_name, "Alexanderplatz 1, 10178 Berlin, Deutschland");
        assert_eq!(addr.street.as_deref(), Some("Alexanderplatz 1"));
        assert_eq!(addr.city.as_deref(), Some("Berlin"));
        assert_eq!(addr.postal_code.as_deref(), Some("10178"));
        assert_eq!(addr.country.as_deref(), Some("Deutschland"));
        assert_eq!(addr.coordinate, berlin());
        assert_eq!(addr.raw, raw);
    }

    #[test]
    fn test_parse_falls_back_to_name() {
        let raw = json!({ "name": "Fernsehturm" });
        let addr = ResolvedAddress::from_payload(berlin(), raw).unwrap();
        assert_eq!(addr.display_name, "Fernsehturm");
        assert!(addr.street.is_none());
    }

    #[test]
    fn test_parse_builds_name_from_fields() {
        let raw = json!({
            "display_name": "",
            "address": { "road": "Karl-Marx-Allee", "town": "Berlin" }
        });
        let addr = ResolvedAddress::from_payload(berlin(), raw).unwrap();
        assert_eq!(addr.display_name, "Karl-Marx-Allee, Berlin");
        assert_eq!(addr.city.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_parse_falls_back_to_coordinate() {
        let addr = ResolvedAddress::from_payload(berlin(), json!({})).unwrap();
        assert_eq!(addr.display_name, "52.521900, 13.413200");
    }

    #[test]
    fn test_parse_error_payload() {
        let raw = json!({ "error": "Unable to geocode" });
        let err = ResolvedAddress::from_payload(berlin(), raw).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_resolved_address_serialization() {
        let addr = ResolvedAddress::from_payload(berlin(), json!({ "name": "Mitte" })).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert!(!json.contains("postal_code"));
        let parsed: ResolvedAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, addr);
    }
}
