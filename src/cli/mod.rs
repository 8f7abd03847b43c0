//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod config;
pub mod locate;
pub mod pick;
pub mod reverse;
pub mod search;
pub mod serve;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Map address resolution for checkout
#[derive(Parser)]
#[command(name = "checkout-locator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the geocoding proxy (foreground)
    Serve(serve::ServeArgs),

    /// Resolve a coordinate to an address
    Reverse(reverse::ReverseArgs),

    /// Search addresses by free text
    Search(search::SearchArgs),

    /// Acquire the current position
    Locate(locate::LocateArgs),

    /// Drive a picker session from an event script on stdin
    Pick(pick::PickArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            init_logging("info");
            serve::run(args).await
        }
        Commands::Reverse(args) => {
            init_logging("warn");
            reverse::run(args).await
        }
        Commands::Search(args) => {
            init_logging("warn");
            search::run(args).await
        }
        Commands::Locate(args) => {
            init_logging("warn");
            locate::run(args).await
        }
        Commands::Pick(args) => {
            init_logging("warn");
            pick::run(args).await
        }
        Commands::Config(args) => config::run(args),
    }
}

/// Log to stderr, filtered by `RUST_LOG` or `default_level`
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
