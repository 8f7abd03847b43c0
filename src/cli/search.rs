//! Search command handler
//!
//! Runs one forward search through the configured upstream gateway.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::Result;
use crate::geo::nominatim::NominatimGateway;
use crate::geo::{Geocoder, SearchOptions};
use clap::Args;

/// Search command arguments
#[derive(Args)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,

    /// Maximum number of results (1-10)
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,

    /// Comma-separated country codes (overrides config)
    #[arg(long, short = 'c')]
    pub countries: Option<String>,

    /// Bias results toward this point, as "lat,lng"
    #[arg(long, allow_hyphen_values = true)]
    pub near: Option<Coordinate>,

    /// Print the provider payload instead of a list
    #[arg(long)]
    pub json: bool,
}

/// Run the search command
pub async fn run(args: SearchArgs) -> Result<()> {
    let config = Config::load()?;
    let gateway = NominatimGateway::new(config.gateway_config())?;

    let options = SearchOptions {
        limit: args.limit,
        country_codes: args.countries,
        bias: args.near,
    };

    if args.json {
        let raw = gateway.search_raw(&args.query, &options).await?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let candidates = gateway.forward_lookup(&args.query, &options).await?;
    if candidates.is_empty() {
        eprintln!("No results for '{}'", args.query.trim());
        return Ok(());
    }

    for candidate in candidates {
        println!("{:>12}  {}  {}", candidate.id, candidate.coordinate, candidate.display_name);
    }

    Ok(())
}
