//! Pick command handler
//!
//! Hosts one picker session in the terminal. Events are read from stdin,
//! one per line:
//!
//! ```text
//! move 52.52,13.40     # drag the map and release it here
//! start                # begin a drag without releasing
//! end 52.52,13.40      # release a drag here
//! type alexanderplatz  # edit the search field
//! open | close         # toggle the suggestion panel
//! select <id>          # choose a suggestion
//! here                 # "use my location"
//! wait 800             # pause, in milliseconds
//! ```
//!
//! Blank lines and `#` comments are ignored. Every state change is printed.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::ip_location::IpPositionSource;
use crate::geo::nominatim::NominatimGateway;
use crate::geo::position::GeolocationAcquirer;
use crate::picker::{MapView, PickerEvent, PickerSender, PickerSession, PickerSnapshot};
use clap::Args;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Pick command arguments
#[derive(Args)]
pub struct PickArgs {
    /// Open the map here instead of locating, as "lat,lng"
    #[arg(long, allow_hyphen_values = true)]
    pub at: Option<Coordinate>,

    /// Address text already known for --at
    #[arg(long, requires = "at")]
    pub address: Option<String>,

    /// Print snapshots as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// One parsed script line
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Event(PickerEvent),
    /// Movement start immediately followed by its end
    Move(Coordinate),
    Wait(Duration),
}

/// Parse one script line; `Ok(None)` for blanks and comments
pub fn parse_line(line: &str) -> Result<Option<ScriptStep>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    let coordinate = |text: &str| text.parse::<Coordinate>().map_err(Error::InvalidParams);

    let step = match command {
        "move" => ScriptStep::Move(coordinate(rest)?),
        "start" => ScriptStep::Event(PickerEvent::MoveStart),
        "end" => ScriptStep::Event(PickerEvent::MoveEnd(coordinate(rest)?)),
        "type" => ScriptStep::Event(PickerEvent::QueryChanged(rest.to_string())),
        "open" => ScriptStep::Event(PickerEvent::PanelOpen(true)),
        "close" => ScriptStep::Event(PickerEvent::PanelOpen(false)),
        "select" if !rest.is_empty() => {
            ScriptStep::Event(PickerEvent::SelectCandidate(rest.to_string()))
        }
        "here" => ScriptStep::Event(PickerEvent::UseMyLocation),
        "wait" => {
            let ms: u64 = rest
                .parse()
                .map_err(|_| Error::InvalidParams(format!("Invalid wait: {}", rest)))?;
            ScriptStep::Wait(Duration::from_millis(ms))
        }
        _ => return Err(Error::InvalidParams(format!("Unknown command: {}", line))),
    };

    Ok(Some(step))
}

/// Map stand-in: prints commands and reports fly-to movement back
#[derive(Default)]
struct TerminalMap {
    events: OnceLock<PickerSender>,
}

impl MapView for TerminalMap {
    fn fly_to(&self, to: Coordinate) {
        println!("map: fly to {}", to);
        if let Some(events) = self.events.get() {
            let _ = events.send(PickerEvent::MoveStart);
            let _ = events.send(PickerEvent::MoveEnd(to));
        }
    }

    fn set_view(&self, to: Coordinate) {
        println!("map: view {}", to);
    }
}

/// Run the pick command
pub async fn run(args: PickArgs) -> Result<()> {
    let config = Config::load()?;
    let gateway = Arc::new(NominatimGateway::new(config.gateway_config())?);
    let source = if config.geolocation.cache_ip_location {
        IpPositionSource::new()
    } else {
        IpPositionSource::without_cache()
    };
    let acquirer = Arc::new(GeolocationAcquirer::new(source, config.acquirer_config()));
    let map = Arc::new(TerminalMap::default());

    let mut options = config.picker_options();
    if let Some(at) = args.at {
        options = options.with_initial(at, args.address);
    }

    let handle = PickerSession::new(gateway, acquirer, Arc::clone(&map), options)
        .on_address_resolved(|address| println!("resolved: {}", address.display_name))
        .spawn();
    let _ = map.events.set(handle.sender());

    let printer = tokio::spawn(print_snapshots(handle.subscribe(), args.json));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ScriptStep::Wait(duration))) => tokio::time::sleep(duration).await,
            Ok(Some(ScriptStep::Move(to))) => {
                handle.move_start()?;
                handle.move_end(to)?;
            }
            Ok(Some(ScriptStep::Event(event))) => handle.send(event)?,
            Err(e) => warn!(error = %e, "skipping script line"),
        }
    }

    // Let pending work finish before closing
    let grace = Duration::from_millis(config.picker.settle_debounce_ms)
        + Duration::from_secs(config.geocoder.timeout_secs);
    let mut rx = handle.subscribe();
    if tokio::time::timeout(grace, rx.wait_for(|s| !s.is_resolving() && !s.locating))
        .await
        .is_err()
    {
        warn!("session still busy at end of script");
    }

    handle.shutdown().await;
    let _ = printer.await;
    Ok(())
}

async fn print_snapshots(mut rx: tokio::sync::watch::Receiver<PickerSnapshot>, json: bool) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if json {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "failed to encode snapshot"),
            }
        } else {
            println!("{}", summarize(&snapshot));
        }
    }
}

/// One-line human summary of a snapshot
fn summarize(snapshot: &PickerSnapshot) -> String {
    let center = snapshot
        .center
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!("[{}] {} | {}", snapshot.movement, center, snapshot.address_text);

    if snapshot.resolve_failed {
        line.push_str(" | lookup failed, move the map to retry");
    }
    if snapshot.panel_open {
        line.push_str(&format!(" | {} suggestion(s)", snapshot.candidates.len()));
        for candidate in &snapshot.candidates {
            line.push_str(&format!("\n    {}  {}", candidate.id, candidate.display_name));
        }
    }
    if snapshot.search_suppressed {
        line.push_str(" | search paused (rate limited)");
    }
    if snapshot.locating {
        line.push_str(" | locating");
    }
    if snapshot.location_unavailable {
        line.push_str(" | location unavailable");
    }
    line
}
