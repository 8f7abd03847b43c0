//! Interactive map picker
//!
//! One picker session turns map movement, typed search text and device
//! geolocation into a single resolved delivery address:
//!
//! - [`resolver`]: movement state machine and latest-wins reverse lookups
//! - [`search`]: debounced autocomplete that stays quiet while the map moves
//! - [`session`]: the per-session actor driving both, plus timers and tasks
//!
//! The map widget itself is an external collaborator reached through
//! [`MapView`]; it reports movement back as [`PickerEvent`]s.

pub mod debounce;
pub mod resolver;
pub mod search;
pub mod session;
pub mod token;

use crate::coord::Coordinate;
use crate::geo::{ResolvedAddress, SearchCandidate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use session::{PickerHandle, PickerSender, PickerSession};

/// Movement lifecycle of the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    #[default]
    Idle,
    Moving,
    Settling,
    Resolving,
}

impl std::fmt::Display for MovementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Moving => write!(f, "moving"),
            Self::Settling => write!(f, "settling"),
            Self::Resolving => write!(f, "resolving"),
        }
    }
}

/// Commands the picker sends to the map widget
pub trait MapView: Send + Sync + 'static {
    /// Animate to `to`; the widget reports the resulting movement back
    fn fly_to(&self, to: Coordinate);

    /// Jump to `to` without animation or movement events
    fn set_view(&self, to: Coordinate);
}

/// Events fed into a picker session
#[derive(Debug, Clone, PartialEq)]
pub enum PickerEvent {
    /// Drag, zoom or programmatic fly-to began
    MoveStart,
    /// Movement ended with the map centered here
    MoveEnd(Coordinate),
    /// The search field text changed
    QueryChanged(String),
    /// Suggestion panel opened (true) or closed (false)
    PanelOpen(bool),
    /// A suggestion was chosen by id
    SelectCandidate(String),
    /// The user asked to center on their current position
    UseMyLocation,
}

/// A known starting point, e.g. when editing a saved address
#[derive(Debug, Clone, PartialEq)]
pub struct InitialPosition {
    pub center: Coordinate,
    /// Address text the caller already has
    pub address_text: Option<String>,
}

/// Per-session tunables
#[derive(Debug, Clone)]
pub struct PickerOptions {
    pub settle_debounce: Duration,
    pub search_debounce: Duration,
    pub min_search_chars: usize,
    /// Abort superseded lookups at the transport level, not only ignore them
    pub abort_stale_requests: bool,
    /// Where to go when no position can be acquired
    pub default_center: Coordinate,
    pub initial: Option<InitialPosition>,
}

impl Default for PickerOptions {
    fn default() -> Self {
        crate::config::Config::default().picker_options()
    }
}

impl PickerOptions {
    pub fn with_initial(mut self, center: Coordinate, address_text: Option<String>) -> Self {
        self.initial = Some(InitialPosition {
            center,
            address_text,
        });
        self
    }
}

/// Observable state of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PickerSnapshot {
    pub movement: MovementState,
    pub center: Option<Coordinate>,
    pub address: Option<ResolvedAddress>,
    /// Text shown in the bound address field
    pub address_text: String,
    /// Last reverse lookup failed; "move the map to retry" affordance
    pub resolve_failed: bool,
    pub query: String,
    pub candidates: Vec<SearchCandidate>,
    pub panel_open: bool,
    /// Search paused after a rate limit until the next keystroke
    pub search_suppressed: bool,
    pub locating: bool,
    /// The last explicit "use my location" request found no position
    pub location_unavailable: bool,
}

impl PickerSnapshot {
    pub fn is_resolving(&self) -> bool {
        self.movement == MovementState::Resolving
    }

    /// Whether to show the "release to confirm" hint
    pub fn is_moving(&self) -> bool {
        self.movement == MovementState::Moving
    }
}
