//! Nominatim geocoding gateway (OpenStreetMap)
//!
//! The only component that talks to the upstream provider. Validates input
//! before any network traffic, attaches the client identifier, contact
//! address and locale hint, and maps upstream failures onto [`Error`].
//!
//! Nominatim's usage policy requires an identifying User-Agent and allows
//! roughly one request per second. No local throttling happens here; a 429
//! is surfaced as [`Error::RateLimited`] and callers must not retry it.

use crate::constants::api::{DEFAULT_USER_AGENT, NOMINATIM_URL};
use crate::constants::search::{DEFAULT_LIMIT, MAX_LIMIT, MIN_GATEWAY_QUERY_CHARS, MIN_LIMIT};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::{Geocoder, ResolvedAddress, SearchCandidate, SearchOptions};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Gateway settings, usually built by [`crate::config::Config::gateway_config`]
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Provider base URL without trailing slash
    pub base_url: String,
    /// Client identifier; required in strict mode
    pub user_agent: Option<String>,
    pub contact_email: Option<String>,
    pub accept_language: Option<String>,
    /// Country restriction used when a search does not name one
    pub country_codes: String,
    pub strict: bool,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_URL.to_string(),
            user_agent: None,
            contact_email: None,
            accept_language: None,
            country_codes: crate::config::defaults::DEFAULT_COUNTRY_CODES.to_string(),
            strict: false,
            timeout: Duration::from_secs(crate::config::defaults::DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    /// Check the client identifier is present when strict mode demands it
    pub fn validate(&self) -> Result<()> {
        if self.strict && self.user_agent.is_none() {
            return Err(Error::Config(
                "geocoder.user_agent must be set when geocoder.strict is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// The identifier actually sent upstream
    pub fn effective_user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// Search parameters after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSearch {
    pub query: String,
    pub limit: u32,
    pub country_codes: String,
    pub bias: Option<Coordinate>,
}

/// Clamp a requested result limit to [1, 10]
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT)
}

/// Nominatim search response item
#[derive(Debug, Deserialize)]
struct NominatimResult {
    #[serde(default)]
    place_id: Option<u64>,
    #[serde(default)]
    osm_type: Option<String>,
    #[serde(default)]
    osm_id: Option<u64>,
    lat: String,
    lon: String,
    display_name: String,
}

/// Nominatim gateway
#[derive(Debug, Clone)]
pub struct NominatimGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl NominatimGateway {
    /// Create a gateway, failing fast on configuration problems
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        if config.user_agent.is_none() {
            warn!(
                user_agent = DEFAULT_USER_AGENT,
                "no geocoder.user_agent configured; falling back to crate identifier"
            );
        }

        let client = reqwest::Client::builder()
            .user_agent(config.effective_user_agent())
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Validate and normalize forward-search input
    pub fn normalize_search(&self, query: &str, options: &SearchOptions) -> Result<NormalizedSearch> {
        let query = query.trim();
        if query.chars().count() < MIN_GATEWAY_QUERY_CHARS {
            return Err(Error::InvalidParams(format!(
                "Query must be at least {} characters",
                MIN_GATEWAY_QUERY_CHARS
            )));
        }

        let country_codes = options
            .country_codes
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.config.country_codes.as_str())
            .to_string();

        Ok(NormalizedSearch {
            query: query.to_string(),
            limit: clamp_limit(options.limit),
            country_codes,
            bias: options.bias.filter(Coordinate::is_valid),
        })
    }

    /// Parameters every upstream call carries
    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        if let Some(email) = &self.config.contact_email {
            params.push(("email", email.clone()));
        }
        if let Some(lang) = &self.config.accept_language {
            params.push(("accept-language", lang.clone()));
        }
        params
    }

    fn reverse_url(&self, at: Coordinate) -> String {
        let mut params = vec![("lat", at.lat.to_string()), ("lon", at.lng.to_string())];
        params.extend(self.common_params());
        format!("{}/reverse?{}", self.config.base_url, encode_query(&params))
    }

    fn search_url(&self, search: &NormalizedSearch) -> String {
        let mut params = vec![
            ("q", search.query.clone()),
            ("limit", search.limit.to_string()),
        ];
        if !search.country_codes.is_empty() {
            params.push(("countrycodes", search.country_codes.clone()));
        }
        if let Some(bias) = search.bias {
            params.push(("viewbox", bias.bias_viewbox().to_query_value()));
            params.push(("bounded", "0".to_string()));
        }
        params.extend(self.common_params());
        format!("{}/search?{}", self.config.base_url, encode_query(&params))
    }

    /// Reverse lookup returning the provider payload untouched
    pub async fn reverse_raw(&self, at: Coordinate) -> Result<serde_json::Value> {
        at.validate()?;
        self.fetch_json(&self.reverse_url(at)).await
    }

    /// Forward lookup returning the provider payload untouched
    pub async fn search_raw(&self, query: &str, options: &SearchOptions) -> Result<serde_json::Value> {
        let search = self.normalize_search(query, options)?;
        self.fetch_json(&self.search_url(&search)).await
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!(url, "upstream geocoder request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Nominatim request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("upstream geocoder rate limited this client");
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "upstream geocoder returned an error status");
            return Err(Error::Upstream {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Decode(format!("Failed to parse Nominatim response: {}", e)))
    }

    /// Parse lat/lng strings to a coordinate
    fn parse_coords(lat: &str, lng: &str) -> Result<Coordinate> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::Decode(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| Error::Decode(format!("Invalid longitude: {}", lng)))?;
        Ok(Coordinate::new(lat, lng))
    }

    fn parse_candidates(raw: serde_json::Value) -> Result<Vec<SearchCandidate>> {
        let results: Vec<NominatimResult> = serde_json::from_value(raw)
            .map_err(|e| Error::Decode(format!("Unexpected search payload: {}", e)))?;

        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                let id = match (result.place_id, result.osm_type, result.osm_id) {
                    (Some(place_id), _, _) => place_id.to_string(),
                    (None, Some(osm_type), Some(osm_id)) => format!("{}{}", osm_type, osm_id),
                    _ => index.to_string(),
                };
                Ok(SearchCandidate {
                    id,
                    coordinate: Self::parse_coords(&result.lat, &result.lon)?,
                    display_name: result.display_name,
                })
            })
            .collect()
    }
}

impl Geocoder for NominatimGateway {
    async fn reverse_lookup(&self, at: Coordinate) -> Result<ResolvedAddress> {
        let raw = self.reverse_raw(at).await?;
        ResolvedAddress::from_payload(at, raw)
    }

    async fn forward_lookup(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchCandidate>> {
        let raw = self.search_raw(query, options).await?;
        Self::parse_candidates(raw)
    }
}

fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server_uri: &str) -> NominatimGateway {
        NominatimGateway::new(GatewayConfig {
            base_url: server_uri.to_string(),
            user_agent: Some("shop-checkout/test".to_string()),
            contact_email: Some("ops@example.com".to_string()),
            accept_language: Some("de".to_string()),
            ..GatewayConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 5);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(7)), 7);
        assert_eq!(clamp_limit(Some(50)), 10);
    }

    #[test]
    fn test_strict_mode_requires_user_agent() {
        let config = GatewayConfig {
            strict: true,
            ..GatewayConfig::default()
        };
        assert!(matches!(NominatimGateway::new(config), Err(Error::Config(_))));

        let lenient = GatewayConfig::default();
        assert_eq!(lenient.effective_user_agent(), DEFAULT_USER_AGENT);
        assert!(NominatimGateway::new(lenient).is_ok());
    }

    #[test]
    fn test_normalize_search() {
        let gateway = gateway_for("http://localhost");
        let search = gateway
            .normalize_search(
                "  alexanderplatz ",
                &SearchOptions {
                    limit: Some(99),
                    country_codes: None,
                    bias: Some(Coordinate::new(f64::NAN, 0.0)),
                },
            )
            .unwrap();

        assert_eq!(search.query, "alexanderplatz");
        assert_eq!(search.limit, 10);
        assert_eq!(search.country_codes, "de");
        assert!(search.bias.is_none());
    }

    #[test]
    fn test_normalize_search_rejects_short_query() {
        let gateway = gateway_for("http://localhost");
        let err = gateway
            .normalize_search(" a ", &SearchOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn test_search_url_with_bias() {
        let gateway = gateway_for("http://localhost");
        let search = gateway
            .normalize_search(
                "unter den linden",
                &SearchOptions::biased_to(Coordinate::new(10.0, 20.0)),
            )
            .unwrap();
        let url = gateway.search_url(&search);

        assert!(url.starts_with("http://localhost/search?q=unter%20den%20linden&limit=5"));
        assert!(url.contains("countrycodes=de"));
        assert!(url.contains("viewbox=19.5%2C10.5%2C20.5%2C9.5"));
        assert!(url.contains("bounded=0"));
        assert!(url.contains("addressdetails=1"));
        assert!(url.contains("email=ops%40example.com"));
    }

    #[test]
    fn test_parse_coords_invalid() {
        assert!(NominatimGateway::parse_coords("invalid", "0").is_err());
        assert!(NominatimGateway::parse_coords("0", "invalid").is_err());
    }

    #[test]
    fn test_parse_candidates_ids() {
        let raw = json!([
            { "place_id": 42, "lat": "52.5", "lon": "13.4", "display_name": "A" },
            { "osm_type": "way", "osm_id": 7, "lat": "52.6", "lon": "13.5", "display_name": "B" },
            { "lat": "52.7", "lon": "13.6", "display_name": "C" }
        ]);
        let candidates = NominatimGateway::parse_candidates(raw).unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["42", "way7", "2"]);
        assert_eq!(candidates[1].coordinate, Coordinate::new(52.6, 13.5));
    }

    #[tokio::test]
    async fn test_reverse_lookup_sends_identification() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "52.52"))
            .and(query_param("lon", "13.405"))
            .and(query_param("addressdetails", "1"))
            .and(query_param("email", "ops@example.com"))
            .and(query_param("accept-language", "de"))
            .and(header("user-agent", "shop-checkout/test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "display_name": "Rotes Rathaus, Berlin",
                "address": { "road": "Rathausstraße", "house_number": "15", "city": "Berlin" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let addr = gateway
            .reverse_lookup(Coordinate::new(52.52, 13.405))
            .await
            .unwrap();

        assert_eq!(addr.display_name, "Rotes Rathaus, Berlin");
        assert_eq!(addr.street.as_deref(), Some("Rathausstraße 15"));
    }

    #[tokio::test]
    async fn test_reverse_lookup_invalid_latitude_makes_no_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let err = gateway
            .reverse_lookup(Coordinate::new(200.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_forward_lookup_short_query_makes_no_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let err = gateway
            .forward_lookup("a", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_forward_lookup_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let err = gateway
            .forward_lookup("friedrichstraße", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let err = gateway
            .reverse_lookup(Coordinate::new(52.52, 13.405))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 503 }));
    }

    #[tokio::test]
    async fn test_forward_lookup_parses_candidates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "alexanderplatz"))
            .and(query_param("limit", "3"))
            .and(query_param("countrycodes", "at"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "place_id": 1, "lat": "52.5219", "lon": "13.4132", "display_name": "Alexanderplatz, Berlin" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let candidates = gateway
            .forward_lookup(
                "alexanderplatz",
                &SearchOptions {
                    limit: Some(3),
                    country_codes: Some("at".to_string()),
                    bias: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "1");
        assert_eq!(candidates[0].display_name, "Alexanderplatz, Berlin");
    }

    #[tokio::test]
    async fn test_transport_failure() {
        // Nothing listens on port 9 (discard) in test environments
        let gateway = gateway_for("http://127.0.0.1:9");
        let err = gateway
            .reverse_lookup(Coordinate::new(52.52, 13.405))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
