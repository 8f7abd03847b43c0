//! Locate command handler
//!
//! Runs the geolocation acquirer (high accuracy, then relaxed) and prints
//! the position it settles on.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::Result;
use crate::geo::ip_location::IpPositionSource;
use crate::geo::position::{FixedPositionSource, GeolocationAcquirer, PositionSource};
use clap::Args;

/// Locate command arguments
#[derive(Args)]
pub struct LocateArgs {
    /// Use this position instead of IP geolocation, as "lat,lng"
    #[arg(long, allow_hyphen_values = true)]
    pub at: Option<Coordinate>,

    /// Fall back to the configured default center instead of failing
    #[arg(long)]
    pub fallback: bool,

    /// Ignore and do not write the IP location cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Run the locate command
pub async fn run(args: LocateArgs) -> Result<()> {
    let config = Config::load()?;

    match args.at {
        Some(at) => locate_with(FixedPositionSource::new(at), &config, args.fallback).await,
        None => {
            let source = if args.no_cache || !config.geolocation.cache_ip_location {
                IpPositionSource::without_cache()
            } else {
                IpPositionSource::new()
            };
            locate_with(source, &config, args.fallback).await
        }
    }
}

async fn locate_with<P: PositionSource>(source: P, config: &Config, fallback: bool) -> Result<()> {
    let acquirer = GeolocationAcquirer::new(source, config.acquirer_config());

    let position = if fallback {
        acquirer.acquire_or(config.default_center()).await
    } else {
        acquirer.acquire().await?
    };

    println!("{}", position);
    Ok(())
}
