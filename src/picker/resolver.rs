//! Map address resolver
//!
//! Owns the movement state machine of one picker session:
//!
//! ```text
//! Idle -> Moving -> Settling -> Resolving -> Idle
//!           ^          |            |
//!           +----------+------------+   (any movement start)
//! ```
//!
//! Movement start always wins: it cancels the settle timer and obsoletes any
//! in-flight reverse lookup. Only the latest issued lookup may ever update
//! the resolved address. This type is synchronous; timers and network calls
//! are driven by [`crate::picker::session`].

use crate::coord::Coordinate;
use crate::error::Error;
use crate::geo::ResolvedAddress;
use crate::picker::debounce::Debounce;
use crate::picker::token::{RequestSequence, RequestToken};
use crate::picker::MovementState;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A reverse lookup the session should issue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupRequest {
    pub token: RequestToken,
    pub center: Coordinate,
}

/// What happened to a completed reverse lookup
#[derive(Debug)]
pub enum ResolveOutcome {
    /// The address is now authoritative
    Applied(ResolvedAddress),
    /// Current lookup failed; the previous address stays
    Failed(Error),
    /// Superseded or torn down; nothing changed
    Stale,
}

#[derive(Debug)]
pub struct MapAddressResolver {
    state: MovementState,
    sequence: RequestSequence,
    settle: Debounce,
    center: Option<Coordinate>,
    address: Option<ResolvedAddress>,
    address_text: String,
    resolve_failed: bool,
    initial_placed: bool,
    in_flight: Option<RequestToken>,
}

impl MapAddressResolver {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: MovementState::Idle,
            sequence: RequestSequence::new(),
            settle: Debounce::new(settle_delay),
            center: None,
            address: None,
            address_text: String::new(),
            resolve_failed: false,
            initial_placed: false,
            in_flight: None,
        }
    }

    /// Place the map at a known position without resolving it
    ///
    /// Used when editing an existing address: the caller already has the
    /// text. Applies at most once per resolver; returns whether it applied.
    pub fn place_initial(&mut self, center: Coordinate, address_text: Option<String>) -> bool {
        if self.initial_placed || self.sequence.is_retired() {
            return false;
        }
        self.initial_placed = true;
        self.center = Some(center);
        if let Some(text) = address_text {
            self.address_text = text;
        }
        debug!(%center, "initial position placed without lookup");
        true
    }

    /// Any movement began (drag, zoom or programmatic fly-to)
    ///
    /// Returns the in-flight lookup this obsoleted, if any.
    pub fn move_start(&mut self) -> Option<RequestToken> {
        if self.sequence.is_retired() {
            return None;
        }
        self.settle.cancel();
        self.sequence.invalidate();
        self.state = MovementState::Moving;
        self.in_flight.take()
    }

    /// Movement ended with the map resting at `center`
    ///
    /// A lookup still running for an earlier center is obsoleted; its token
    /// is returned so the task can be aborted.
    pub fn move_end(&mut self, center: Coordinate, now: Instant) -> Option<RequestToken> {
        if self.sequence.is_retired() {
            return None;
        }
        let obsolete = self.in_flight.take();
        if obsolete.is_some() {
            self.sequence.invalidate();
        }
        self.center = Some(center);
        self.state = MovementState::Settling;
        self.settle.arm(now);
        obsolete
    }

    /// When the settle timer fires, if armed
    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle.deadline()
    }

    /// Settle timer elapsed with no intervening movement
    pub fn settle_elapsed(&mut self, now: Instant) -> Option<LookupRequest> {
        if self.state != MovementState::Settling {
            self.settle.cancel();
            return None;
        }
        if !self.settle.fire_if_due(now) {
            return None;
        }
        let center = self.center?;
        let token = self.sequence.issue();
        self.in_flight = Some(token);
        self.state = MovementState::Resolving;
        debug!(%token, %center, "settled; resolving");
        Some(LookupRequest { token, center })
    }

    /// Apply the completion of the lookup tagged `token`
    pub fn apply(
        &mut self,
        token: RequestToken,
        result: crate::error::Result<ResolvedAddress>,
    ) -> ResolveOutcome {
        if let Err(e) = self.sequence.ensure_current(token) {
            debug!(%token, error = %e, "dropping reverse result");
            return ResolveOutcome::Stale;
        }
        self.in_flight = None;
        self.state = MovementState::Idle;

        match result {
            Ok(address) => {
                info!(%token, display_name = %address.display_name, "address resolved");
                self.address_text = address.display_name.clone();
                self.address = Some(address.clone());
                self.resolve_failed = false;
                ResolveOutcome::Applied(address)
            }
            Err(e) => {
                warn!(%token, error = %e, "reverse lookup failed; keeping previous address");
                self.resolve_failed = true;
                ResolveOutcome::Failed(e)
            }
        }
    }

    /// Stop for good: no timer, no current token, no further mutation
    ///
    /// Returns the in-flight lookup, if any, so its task can be aborted.
    pub fn teardown(&mut self) -> Option<RequestToken> {
        self.settle.cancel();
        self.sequence.retire();
        self.state = MovementState::Idle;
        self.in_flight.take()
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn is_resolving(&self) -> bool {
        self.state == MovementState::Resolving
    }

    pub fn center(&self) -> Option<Coordinate> {
        self.center
    }

    pub fn address(&self) -> Option<&ResolvedAddress> {
        self.address.as_ref()
    }

    /// Text mirrored into the bound address field
    pub fn address_text(&self) -> &str {
        &self.address_text
    }

    /// Soft failure indicator for the last lookup
    pub fn resolve_failed(&self) -> bool {
        self.resolve_failed
    }

    pub fn in_flight(&self) -> Option<RequestToken> {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(350);

    fn address(name: &str, at: Coordinate) -> ResolvedAddress {
        ResolvedAddress::from_payload(at, serde_json::json!({ "display_name": name })).unwrap()
    }

    fn settle_at(resolver: &mut MapAddressResolver, center: Coordinate, now: Instant) -> LookupRequest {
        resolver.move_start();
        resolver.move_end(center, now);
        resolver.settle_elapsed(now + SETTLE).unwrap()
    }

    #[test]
    fn test_full_cycle() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);
        let a = Coordinate::new(52.52, 13.40);

        resolver.move_start();
        assert_eq!(resolver.state(), MovementState::Moving);

        resolver.move_end(a, now);
        assert_eq!(resolver.state(), MovementState::Settling);
        assert!(resolver.settle_elapsed(now + Duration::from_millis(100)).is_none());

        let request = resolver.settle_elapsed(now + SETTLE).unwrap();
        assert_eq!(request.center, a);
        assert!(resolver.is_resolving());

        let outcome = resolver.apply(request.token, Ok(address("Alexanderplatz", a)));
        assert!(matches!(outcome, ResolveOutcome::Applied(_)));
        assert_eq!(resolver.state(), MovementState::Idle);
        assert_eq!(resolver.address_text(), "Alexanderplatz");
    }

    #[test]
    fn test_move_start_during_settle_cancels_timer() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);

        resolver.move_start();
        resolver.move_end(Coordinate::new(1.0, 1.0), now);
        resolver.move_start();

        assert_eq!(resolver.state(), MovementState::Moving);
        assert!(resolver.settle_deadline().is_none());
        assert!(resolver.settle_elapsed(now + SETTLE).is_none());
    }

    #[test]
    fn test_move_start_obsoletes_in_flight() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);
        let a = Coordinate::new(1.0, 1.0);

        let request = settle_at(&mut resolver, a, now);
        assert_eq!(resolver.move_start(), Some(request.token));

        let outcome = resolver.apply(request.token, Ok(address("A", a)));
        assert!(matches!(outcome, ResolveOutcome::Stale));
        assert_eq!(resolver.state(), MovementState::Moving);
        assert!(resolver.address().is_none());
    }

    #[test]
    fn test_latest_wins_regardless_of_arrival() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);
        let (a, b, c) = (
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
            Coordinate::new(3.0, 3.0),
        );

        let ra = settle_at(&mut resolver, a, now);
        let rb = settle_at(&mut resolver, b, now);
        let rc = settle_at(&mut resolver, c, now);

        assert!(matches!(resolver.apply(rc.token, Ok(address("C", c))), ResolveOutcome::Applied(_)));
        assert!(matches!(resolver.apply(ra.token, Ok(address("A", a))), ResolveOutcome::Stale));
        assert!(matches!(resolver.apply(rb.token, Ok(address("B", b))), ResolveOutcome::Stale));

        assert_eq!(resolver.address().unwrap().display_name, "C");
        assert_eq!(resolver.address().unwrap().coordinate, c);
    }

    #[test]
    fn test_move_end_while_resolving_obsoletes_lookup() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);
        let (a, b) = (Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0));

        let first = settle_at(&mut resolver, a, now);
        assert_eq!(resolver.move_end(b, now + SETTLE), Some(first.token));
        assert_eq!(resolver.state(), MovementState::Settling);

        // the earlier lookup answers inside the settle window
        let outcome = resolver.apply(first.token, Ok(address("A", a)));
        assert!(matches!(outcome, ResolveOutcome::Stale));
        assert!(resolver.address().is_none());
        assert_eq!(resolver.state(), MovementState::Settling);

        let second = resolver.settle_elapsed(now + SETTLE * 2).unwrap();
        assert_eq!(second.center, b);
        resolver.apply(second.token, Ok(address("B", b)));
        assert_eq!(resolver.address().unwrap().coordinate, b);
        assert!(resolver.settle_deadline().is_none());
    }

    #[test]
    fn test_settle_outside_settling_disarms() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);

        resolver.move_start();
        resolver.move_end(Coordinate::new(1.0, 1.0), now);
        resolver.move_start();
        // a deadline armed while not settling must not linger
        resolver.settle.arm(now);

        assert!(resolver.settle_elapsed(now + SETTLE).is_none());
        assert!(resolver.settle_deadline().is_none());
    }

    #[test]
    fn test_failure_keeps_previous_address() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);
        let a = Coordinate::new(1.0, 1.0);

        let first = settle_at(&mut resolver, a, now);
        resolver.apply(first.token, Ok(address("A", a)));

        let second = settle_at(&mut resolver, Coordinate::new(2.0, 2.0), now);
        let outcome = resolver.apply(second.token, Err(Error::RateLimited));

        assert!(matches!(outcome, ResolveOutcome::Failed(Error::RateLimited)));
        assert_eq!(resolver.state(), MovementState::Idle);
        assert!(resolver.resolve_failed());
        assert_eq!(resolver.address().unwrap().display_name, "A");
        assert_eq!(resolver.address_text(), "A");
        // no automatic retry
        assert!(resolver.settle_deadline().is_none());
    }

    #[test]
    fn test_initial_placement_is_one_shot() {
        let mut resolver = MapAddressResolver::new(SETTLE);
        let home = Coordinate::new(48.1374, 11.5755);

        assert!(resolver.place_initial(home, Some("Marienplatz 1".to_string())));
        assert!(!resolver.place_initial(Coordinate::new(0.0, 0.0), None));

        assert_eq!(resolver.center(), Some(home));
        assert_eq!(resolver.address_text(), "Marienplatz 1");
        assert_eq!(resolver.state(), MovementState::Idle);
        assert!(resolver.in_flight().is_none());
    }

    #[test]
    fn test_teardown_drops_late_results() {
        let now = Instant::now();
        let mut resolver = MapAddressResolver::new(SETTLE);
        let a = Coordinate::new(1.0, 1.0);

        let request = settle_at(&mut resolver, a, now);
        assert_eq!(resolver.teardown(), Some(request.token));

        assert!(matches!(resolver.apply(request.token, Ok(address("A", a))), ResolveOutcome::Stale));
        assert!(resolver.address().is_none());

        resolver.move_start();
        resolver.move_end(a, now);
        assert!(resolver.settle_elapsed(now + SETTLE).is_none());
    }
}
