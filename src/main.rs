//! checkout-locator CLI entry point
//!
//! Geocoding proxy and map address picker

use checkout_locator::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
