//! Search autocomplete controller
//!
//! Turns typed text into suggestions without racing the map resolver. The
//! debounce is armed by keystrokes and re-armed when the panel opens or the
//! map comes to rest; when it fires, the search is skipped unless the query
//! is long enough, the map is idle, the panel is open and the upstream has
//! not rate limited us since the last keystroke.
//!
//! Selecting a candidate never sets the resolved address. It yields a
//! coordinate for a single fly-to; the resolver takes it from there.

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::SearchCandidate;
use crate::picker::debounce::Debounce;
use crate::picker::token::{RequestSequence, RequestToken};
use crate::picker::MovementState;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A forward search the session should issue
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub token: RequestToken,
    pub query: String,
    pub bias: Option<Coordinate>,
    /// Earlier search this one replaces, if still in flight
    pub superseded: Option<RequestToken>,
}

/// Why a due debounce did not produce a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    QueryTooShort,
    MapMoving,
    PanelClosed,
    RateLimited,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchDecision {
    NotDue,
    Skip(SkipReason),
    Issue(SearchRequest),
}

#[derive(Debug)]
pub enum SearchOutcome {
    /// Candidates replaced; carries how many
    Applied(usize),
    /// Current search failed; candidates cleared
    Failed(Error),
    Stale,
}

#[derive(Debug)]
pub struct SearchController {
    query: String,
    typed: bool,
    panel_open: bool,
    candidates: Vec<SearchCandidate>,
    sequence: RequestSequence,
    debounce: Debounce,
    suppressed: bool,
    min_chars: usize,
    in_flight: Option<RequestToken>,
}

impl SearchController {
    pub fn new(delay: Duration, min_chars: usize) -> Self {
        Self {
            query: String::new(),
            typed: false,
            panel_open: false,
            candidates: Vec::new(),
            sequence: RequestSequence::new(),
            debounce: Debounce::new(delay),
            suppressed: false,
            min_chars,
            in_flight: None,
        }
    }

    /// The user edited the query text
    pub fn query_changed(&mut self, text: impl Into<String>, now: Instant) {
        if self.sequence.is_retired() {
            return;
        }
        self.query = text.into();
        self.typed = true;
        self.suppressed = false;
        self.debounce.arm(now);
    }

    /// Suggestion panel opened or closed
    ///
    /// Closing drops the list and obsoletes any in-flight search; the
    /// returned token, if any, can be aborted.
    pub fn set_panel_open(&mut self, open: bool, now: Instant) -> Option<RequestToken> {
        if self.sequence.is_retired() || self.panel_open == open {
            return None;
        }
        self.panel_open = open;
        if open {
            self.rearm(now);
            None
        } else {
            self.debounce.cancel();
            self.candidates.clear();
            self.sequence.invalidate();
            self.in_flight.take()
        }
    }

    /// The map came to rest; a query typed while moving gets its turn now
    pub fn movement_idle(&mut self, now: Instant) {
        self.rearm(now);
    }

    fn rearm(&mut self, now: Instant) {
        if self.typed && self.panel_open && !self.suppressed && !self.sequence.is_retired() {
            self.debounce.arm(now);
        }
    }

    /// Show resolver output in the field without searching for it
    ///
    /// Text the user typed is left alone until a suggestion is selected.
    pub fn mirror_text(&mut self, text: impl Into<String>) {
        if self.sequence.is_retired() || self.typed {
            return;
        }
        self.query = text.into();
        self.typed = false;
        self.debounce.cancel();
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Decide what a (possibly) elapsed debounce means
    pub fn debounce_elapsed(
        &mut self,
        now: Instant,
        movement: MovementState,
        bias: Option<Coordinate>,
    ) -> SearchDecision {
        if !self.debounce.fire_if_due(now) {
            return SearchDecision::NotDue;
        }

        let skip = if self.query.trim().chars().count() < self.min_chars {
            Some(SkipReason::QueryTooShort)
        } else if movement != MovementState::Idle {
            Some(SkipReason::MapMoving)
        } else if !self.panel_open {
            Some(SkipReason::PanelClosed)
        } else if self.suppressed {
            Some(SkipReason::RateLimited)
        } else {
            None
        };
        if let Some(reason) = skip {
            debug!(?reason, "search skipped");
            return SearchDecision::Skip(reason);
        }

        let superseded = self.in_flight.take();
        let token = self.sequence.issue();
        self.in_flight = Some(token);
        debug!(%token, query = %self.query.trim(), "issuing search");

        SearchDecision::Issue(SearchRequest {
            token,
            query: self.query.trim().to_string(),
            bias,
            superseded,
        })
    }

    /// Apply the completion of the search tagged `token`
    pub fn apply(&mut self, token: RequestToken, result: Result<Vec<SearchCandidate>>) -> SearchOutcome {
        if let Err(e) = self.sequence.ensure_current(token) {
            debug!(%token, error = %e, "dropping search result");
            return SearchOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(candidates) => {
                let count = candidates.len();
                self.candidates = candidates;
                SearchOutcome::Applied(count)
            }
            Err(e) => {
                if matches!(e, Error::RateLimited) {
                    warn!("search rate limited; suppressed until next keystroke");
                    self.suppressed = true;
                    self.debounce.cancel();
                } else {
                    debug!(error = %e, "search failed");
                }
                self.candidates.clear();
                SearchOutcome::Failed(e)
            }
        }
    }

    /// Pick a candidate from the current list by id
    ///
    /// Closes the panel and clears all candidate state. Returns the point to
    /// fly to, or `None` if the id is not in the current list (so repeating
    /// a selection is a no-op).
    pub fn select(&mut self, id: &str) -> Option<(Coordinate, String, Option<RequestToken>)> {
        if self.sequence.is_retired() {
            return None;
        }
        let candidate = self.candidates.iter().find(|c| c.id == id)?.clone();

        self.panel_open = false;
        self.candidates.clear();
        self.debounce.cancel();
        self.typed = false;
        self.query = candidate.display_name.clone();
        self.sequence.invalidate();
        let superseded = self.in_flight.take();

        Some((candidate.coordinate, candidate.display_name, superseded))
    }

    /// Stop for good
    pub fn teardown(&mut self) -> Option<RequestToken> {
        self.debounce.cancel();
        self.sequence.retire();
        self.candidates.clear();
        self.in_flight.take()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn candidates(&self) -> &[SearchCandidate] {
        &self.candidates
    }

    pub fn panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn in_flight(&self) -> Option<RequestToken> {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    fn candidate(id: &str, lat: f64) -> SearchCandidate {
        SearchCandidate {
            id: id.to_string(),
            coordinate: Coordinate::new(lat, 13.4),
            display_name: format!("Place {}", id),
        }
    }

    fn open_controller(now: Instant) -> SearchController {
        let mut search = SearchController::new(DELAY, 3);
        search.set_panel_open(true, now);
        search
    }

    fn issue(search: &mut SearchController, text: &str, now: Instant) -> SearchRequest {
        search.query_changed(text, now);
        match search.debounce_elapsed(now + DELAY, MovementState::Idle, None) {
            SearchDecision::Issue(request) => request,
            other => panic!("expected a search, got {:?}", other),
        }
    }

    #[test]
    fn test_debounce_restarts_on_keystroke() {
        let now = Instant::now();
        let mut search = open_controller(now);

        search.query_changed("ale", now);
        search.query_changed("alex", now + Duration::from_millis(300));

        assert_eq!(
            search.debounce_elapsed(now + DELAY, MovementState::Idle, None),
            SearchDecision::NotDue
        );
        match search.debounce_elapsed(now + Duration::from_millis(800), MovementState::Idle, None) {
            SearchDecision::Issue(request) => assert_eq!(request.query, "alex"),
            other => panic!("expected a search, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_reasons() {
        let now = Instant::now();
        let later = now + DELAY;

        let mut search = open_controller(now);
        search.query_changed(" al ", now);
        assert_eq!(
            search.debounce_elapsed(later, MovementState::Idle, None),
            SearchDecision::Skip(SkipReason::QueryTooShort)
        );

        search.query_changed("alex", now);
        assert_eq!(
            search.debounce_elapsed(later, MovementState::Moving, None),
            SearchDecision::Skip(SkipReason::MapMoving)
        );

        let mut closed = SearchController::new(DELAY, 3);
        closed.query_changed("alex", now);
        assert_eq!(
            closed.debounce_elapsed(later, MovementState::Idle, None),
            SearchDecision::Skip(SkipReason::PanelClosed)
        );
    }

    #[test]
    fn test_movement_idle_rearms_pending_query() {
        let now = Instant::now();
        let mut search = open_controller(now);

        search.query_changed("alex", now);
        assert!(matches!(
            search.debounce_elapsed(now + DELAY, MovementState::Moving, None),
            SearchDecision::Skip(SkipReason::MapMoving)
        ));

        let rest = now + Duration::from_secs(2);
        search.movement_idle(rest);
        assert!(matches!(
            search.debounce_elapsed(rest + DELAY, MovementState::Idle, None),
            SearchDecision::Issue(_)
        ));
    }

    #[test]
    fn test_latest_search_wins() {
        let now = Instant::now();
        let mut search = open_controller(now);

        let first = issue(&mut search, "alex", now);
        let second = issue(&mut search, "alexa", now);
        assert_eq!(second.superseded, Some(first.token));

        assert!(matches!(
            search.apply(second.token, Ok(vec![candidate("2", 2.0)])),
            SearchOutcome::Applied(1)
        ));
        assert!(matches!(
            search.apply(first.token, Ok(vec![candidate("1", 1.0), candidate("x", 9.0)])),
            SearchOutcome::Stale
        ));
        assert_eq!(search.candidates().len(), 1);
        assert_eq!(search.candidates()[0].id, "2");
    }

    #[test]
    fn test_rate_limit_suppresses_until_keystroke() {
        let now = Instant::now();
        let mut search = open_controller(now);

        let request = issue(&mut search, "alex", now);
        assert!(matches!(
            search.apply(request.token, Err(Error::RateLimited)),
            SearchOutcome::Failed(Error::RateLimited)
        ));
        assert!(search.is_suppressed());

        // panel toggles and the map resting do not re-arm
        search.set_panel_open(false, now);
        search.set_panel_open(true, now);
        search.movement_idle(now);
        assert!(search.debounce_deadline().is_none());

        // the next keystroke does
        let next = issue(&mut search, "alexan", now);
        assert!(!search.is_suppressed());
        assert!(next.token > request.token);
    }

    #[test]
    fn test_select_is_idempotent() {
        let now = Instant::now();
        let mut search = open_controller(now);

        let request = issue(&mut search, "alex", now);
        search.apply(request.token, Ok(vec![candidate("7", 52.52)]));

        let (coord, name, _) = search.select("7").unwrap();
        assert_eq!(coord, Coordinate::new(52.52, 13.4));
        assert_eq!(name, "Place 7");
        assert!(!search.panel_open());
        assert!(search.candidates().is_empty());

        assert!(search.select("7").is_none());
    }

    #[test]
    fn test_mirror_text_does_not_search() {
        let now = Instant::now();
        let mut search = open_controller(now);

        search.mirror_text("Alexanderplatz 1, Berlin");
        search.movement_idle(now);

        assert_eq!(search.query(), "Alexanderplatz 1, Berlin");
        assert!(search.debounce_deadline().is_none());
    }

    #[test]
    fn test_mirror_text_keeps_typed_query() {
        let now = Instant::now();
        let mut search = open_controller(now);

        search.query_changed("alexanderplatz", now);
        search.mirror_text("Karl-Marx-Allee 1, Berlin");
        assert_eq!(search.query(), "alexanderplatz");
        assert!(search.debounce_deadline().is_some());

        let rest = now + Duration::from_secs(2);
        search.movement_idle(rest);
        match search.debounce_elapsed(rest + DELAY, MovementState::Idle, None) {
            SearchDecision::Issue(request) => assert_eq!(request.query, "alexanderplatz"),
            other => panic!("expected a search, got {:?}", other),
        }
    }

    #[test]
    fn test_teardown() {
        let now = Instant::now();
        let mut search = open_controller(now);
        let request = issue(&mut search, "alex", now);

        assert_eq!(search.teardown(), Some(request.token));
        assert!(matches!(
            search.apply(request.token, Ok(vec![candidate("1", 1.0)])),
            SearchOutcome::Stale
        ));
        search.query_changed("alexa", now);
        assert!(search.debounce_deadline().is_none());
    }
}
