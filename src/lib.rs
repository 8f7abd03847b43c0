//! checkout-locator: map address resolution for checkout
//!
//! A library and CLI tool that turns a moving map viewport into a postal
//! address through a Nominatim-compatible geocoding provider.
//!
//! ## Features
//!
//! - Upstream gateway with parameter normalization and status mapping
//! - Geolocation with high/low accuracy fallback and IP-based positions
//! - Debounced, latest-wins reverse lookups driven by map movement
//! - Search autocomplete that stays quiet while the map moves
//! - HTTP proxy + CLI interface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use checkout_locator::geo::nominatim::{GatewayConfig, NominatimGateway};
//! use checkout_locator::geo::Geocoder;
//! use checkout_locator::Coordinate;
//!
//! # async fn demo() -> checkout_locator::Result<()> {
//! let gateway = NominatimGateway::new(GatewayConfig {
//!     user_agent: Some("my-shop/1.0".to_string()),
//!     ..GatewayConfig::default()
//! })?;
//!
//! let address = gateway.reverse_lookup(Coordinate::new(52.5219, 13.4132)).await?;
//! println!("{}", address.display_name);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod geo;
pub mod picker;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use coord::Coordinate;
pub use error::{Error, Result};
pub use geo::{Geocoder, ResolvedAddress, SearchCandidate};
pub use picker::{MovementState, PickerEvent, PickerHandle, PickerSession, PickerSnapshot};
