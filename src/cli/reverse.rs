//! Reverse command handler
//!
//! Resolves one coordinate through the configured upstream gateway.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::Result;
use crate::geo::nominatim::NominatimGateway;
use crate::geo::ResolvedAddress;
use clap::Args;

/// Reverse command arguments
#[derive(Args)]
pub struct ReverseArgs {
    /// Latitude
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,

    /// Print the provider payload instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Run the reverse command
pub async fn run(args: ReverseArgs) -> Result<()> {
    let config = Config::load()?;
    let gateway = NominatimGateway::new(config.gateway_config())?;
    let at = Coordinate::new(args.lat, args.lng);

    if args.json {
        let raw = gateway.reverse_raw(at).await?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let raw = gateway.reverse_raw(at).await?;
    let address = ResolvedAddress::from_payload(at, raw)?;
    print_address(&address);

    Ok(())
}

fn print_address(address: &ResolvedAddress) {
    println!("{}", address.display_name);
    println!();

    let fields = [
        ("Street", &address.street),
        ("City", &address.city),
        ("Postal code", &address.postal_code),
        ("Country", &address.country),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<12} {}", format!("{}:", label), value);
        }
    }
    println!("  {:<12} {}", "Coordinate:", address.coordinate);
}
