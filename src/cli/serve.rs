//! Serve command handler
//!
//! Starts the geocoding proxy in foreground mode.

use crate::config::Config;
use crate::error::Result;
use crate::server;
use clap::Args;
use tracing::info;

/// Serve command arguments
#[derive(Args)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Upstream provider base URL
    #[arg(long)]
    pub upstream: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    // Load and optionally override config
    let mut config = Config::load()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(upstream) = args.upstream {
        config.geocoder.base_url = upstream;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server_addr(),
        upstream = %config.geocoder.base_url,
        "starting checkout-locator proxy"
    );

    server::run(config).await
}
