//! Picker session actor
//!
//! Each session is one tokio task owning a [`MapAddressResolver`], a
//! [`SearchController`], one deadline per operation and a `JoinSet` of
//! in-flight lookups. Everything arrives as a message: user events through
//! the handle, lookup completions through the join set. No state is shared
//! between sessions.
//!
//! Dropping (or shutting down) the handle tears the session down: timers
//! stop, in-flight tasks are aborted, token sequences are retired, and
//! neither the snapshot nor the callback is written again.

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::position::{GeolocationAcquirer, PositionSource};
use crate::geo::{Geocoder, ResolvedAddress, SearchCandidate, SearchOptions};
use crate::picker::resolver::{LookupRequest, MapAddressResolver, ResolveOutcome};
use crate::picker::search::{SearchController, SearchDecision, SearchOutcome, SearchRequest};
use crate::picker::token::RequestToken;
use crate::picker::{MapView, PickerEvent, PickerOptions, PickerSnapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Called with every address the session resolves
pub type AddressCallback = Box<dyn Fn(&ResolvedAddress) + Send + Sync>;

/// Completed background work, tagged with its token
enum Completion {
    Reverse {
        token: RequestToken,
        result: Result<ResolvedAddress>,
    },
    Search {
        token: RequestToken,
        result: Result<Vec<SearchCandidate>>,
    },
    Located {
        result: Result<Coordinate>,
        automatic: bool,
    },
}

/// Builder for a picker session
pub struct PickerSession<G, P, M> {
    geocoder: Arc<G>,
    acquirer: Arc<GeolocationAcquirer<P>>,
    map: Arc<M>,
    options: PickerOptions,
    on_resolved: Option<AddressCallback>,
}

impl<G, P, M> PickerSession<G, P, M>
where
    G: Geocoder + 'static,
    P: PositionSource + 'static,
    M: MapView,
{
    pub fn new(
        geocoder: Arc<G>,
        acquirer: Arc<GeolocationAcquirer<P>>,
        map: Arc<M>,
        options: PickerOptions,
    ) -> Self {
        Self {
            geocoder,
            acquirer,
            map,
            options,
            on_resolved: None,
        }
    }

    /// Register the callback receiving each resolved address
    pub fn on_address_resolved<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ResolvedAddress) + Send + Sync + 'static,
    {
        self.on_resolved = Some(Box::new(callback));
        self
    }

    /// Start the session task
    pub fn spawn(self) -> PickerHandle {
        let id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(PickerSnapshot::default());

        let actor = SessionActor {
            resolver: MapAddressResolver::new(self.options.settle_debounce),
            search: SearchController::new(
                self.options.search_debounce,
                self.options.min_search_chars,
            ),
            geocoder: self.geocoder,
            acquirer: self.acquirer,
            map: self.map,
            options: self.options,
            on_resolved: self.on_resolved,
            snapshot: snapshot_tx,
            tasks: JoinSet::new(),
            reverse_task: None,
            search_task: None,
            locating: false,
            location_unavailable: false,
        };

        let span = info_span!("picker", session = %id);
        let task = tokio::spawn(actor.run(events_rx).instrument(span));

        PickerHandle {
            id,
            events: PickerSender { tx: events_tx },
            snapshot: snapshot_rx,
            task,
        }
    }
}

/// Cloneable event sender into one session
#[derive(Debug, Clone)]
pub struct PickerSender {
    tx: mpsc::UnboundedSender<PickerEvent>,
}

impl PickerSender {
    pub fn send(&self, event: PickerEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::SessionClosed)
    }
}

/// Owner handle of a running session
///
/// The session lives until this handle and every [`PickerSender`] cloned
/// from it are dropped, or until [`PickerHandle::shutdown`].
#[derive(Debug)]
pub struct PickerHandle {
    id: Uuid,
    events: PickerSender,
    snapshot: watch::Receiver<PickerSnapshot>,
    task: JoinHandle<()>,
}

impl PickerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn send(&self, event: PickerEvent) -> Result<()> {
        self.events.send(event)
    }

    /// A sender for the map widget or other event sources
    pub fn sender(&self) -> PickerSender {
        self.events.clone()
    }

    pub fn move_start(&self) -> Result<()> {
        self.send(PickerEvent::MoveStart)
    }

    pub fn move_end(&self, center: Coordinate) -> Result<()> {
        self.send(PickerEvent::MoveEnd(center))
    }

    pub fn type_query(&self, text: impl Into<String>) -> Result<()> {
        self.send(PickerEvent::QueryChanged(text.into()))
    }

    pub fn open_panel(&self, open: bool) -> Result<()> {
        self.send(PickerEvent::PanelOpen(open))
    }

    pub fn select(&self, id: impl Into<String>) -> Result<()> {
        self.send(PickerEvent::SelectCandidate(id.into()))
    }

    pub fn use_my_location(&self) -> Result<()> {
        self.send(PickerEvent::UseMyLocation)
    }

    /// Latest published state
    pub fn snapshot(&self) -> PickerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<PickerSnapshot> {
        self.snapshot.clone()
    }

    /// Abort the session immediately and wait for it to stop
    ///
    /// Events still queued are discarded.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

struct SessionActor<G, P, M> {
    resolver: MapAddressResolver,
    search: SearchController,
    geocoder: Arc<G>,
    acquirer: Arc<GeolocationAcquirer<P>>,
    map: Arc<M>,
    options: PickerOptions,
    on_resolved: Option<AddressCallback>,
    snapshot: watch::Sender<PickerSnapshot>,
    tasks: JoinSet<Completion>,
    reverse_task: Option<(RequestToken, AbortHandle)>,
    search_task: Option<(RequestToken, AbortHandle)>,
    locating: bool,
    location_unavailable: bool,
}

impl<G, P, M> SessionActor<G, P, M>
where
    G: Geocoder + 'static,
    P: PositionSource + 'static,
    M: MapView,
{
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<PickerEvent>) {
        info!("picker session started");
        let _teardown = TeardownGuard;
        self.start();
        self.publish();

        loop {
            let settle = self.resolver.settle_deadline();
            let search = self.search.debounce_deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    // Aborted tasks surface as cancelled joins
                    if let Ok(completion) = joined {
                        self.handle_completion(completion);
                    }
                }
                _ = sleep_until(settle.unwrap_or_else(Instant::now)), if settle.is_some() => {
                    self.settle_elapsed();
                }
                _ = sleep_until(search.unwrap_or_else(Instant::now)), if search.is_some() => {
                    self.search_due();
                }
            }

            self.publish();
        }

        self.teardown();
    }

    /// Initial positioning: known coordinates bypass resolution once,
    /// otherwise geolocation runs automatically
    fn start(&mut self) {
        match self.options.initial.clone() {
            Some(initial) => {
                if self.resolver.place_initial(initial.center, initial.address_text.clone()) {
                    if let Some(text) = initial.address_text {
                        self.search.mirror_text(text);
                    }
                    self.map.set_view(initial.center);
                }
            }
            None => {
                self.map.set_view(self.options.default_center);
                self.locate(true);
            }
        }
    }

    fn handle_event(&mut self, event: PickerEvent) {
        let now = Instant::now();
        debug!(?event, state = %self.resolver.state(), "picker event");

        match event {
            PickerEvent::MoveStart => {
                if let Some(obsolete) = self.resolver.move_start() {
                    self.cancel_reverse(obsolete);
                }
            }
            PickerEvent::MoveEnd(center) => {
                if let Some(obsolete) = self.resolver.move_end(center, now) {
                    self.cancel_reverse(obsolete);
                }
            }
            PickerEvent::QueryChanged(text) => self.search.query_changed(text, now),
            PickerEvent::PanelOpen(open) => {
                if let Some(obsolete) = self.search.set_panel_open(open, now) {
                    self.cancel_search(obsolete);
                }
            }
            PickerEvent::SelectCandidate(id) => {
                if let Some((center, name, superseded)) = self.search.select(&id) {
                    if let Some(obsolete) = superseded {
                        self.cancel_search(obsolete);
                    }
                    info!(candidate = %id, display_name = %name, "candidate selected");
                    self.map.fly_to(center);
                } else {
                    debug!(candidate = %id, "selection ignored; not in current list");
                }
            }
            PickerEvent::UseMyLocation => self.locate(false),
        }
    }

    fn settle_elapsed(&mut self) {
        if let Some(request) = self.resolver.settle_elapsed(Instant::now()) {
            self.spawn_reverse(request);
        }
    }

    fn search_due(&mut self) {
        let decision = self.search.debounce_elapsed(
            Instant::now(),
            self.resolver.state(),
            self.resolver.center(),
        );
        if let SearchDecision::Issue(request) = decision {
            if let Some(obsolete) = request.superseded {
                self.cancel_search(obsolete);
            }
            self.spawn_search(request);
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let now = Instant::now();

        match completion {
            Completion::Reverse { token, result } => {
                self.forget_reverse(token);
                match self.resolver.apply(token, result) {
                    ResolveOutcome::Applied(address) => {
                        self.search.mirror_text(address.display_name.clone());
                        self.search.movement_idle(now);
                        if let Some(callback) = &self.on_resolved {
                            callback(&address);
                        }
                    }
                    ResolveOutcome::Failed(_) => self.search.movement_idle(now),
                    ResolveOutcome::Stale => {}
                }
            }
            Completion::Search { token, result } => {
                self.forget_search(token);
                if let SearchOutcome::Applied(count) = self.search.apply(token, result) {
                    debug!(%token, count, "suggestions updated");
                }
            }
            Completion::Located { result, automatic } => {
                self.locating = false;
                match result {
                    Ok(position) => {
                        self.location_unavailable = false;
                        self.map.fly_to(position);
                    }
                    Err(e) if automatic => {
                        warn!(error = %e, "no position at startup; using default center");
                        self.map.fly_to(self.options.default_center);
                    }
                    Err(e) => {
                        warn!(error = %e, "position requested but unavailable");
                        self.location_unavailable = true;
                    }
                }
            }
        }
    }

    fn spawn_reverse(&mut self, request: LookupRequest) {
        let geocoder = Arc::clone(&self.geocoder);
        let LookupRequest { token, center } = request;
        let handle = self.tasks.spawn(async move {
            let result = geocoder.reverse_lookup(center).await;
            Completion::Reverse { token, result }
        });
        self.reverse_task = Some((token, handle));
    }

    fn spawn_search(&mut self, request: SearchRequest) {
        let geocoder = Arc::clone(&self.geocoder);
        let SearchRequest {
            token, query, bias, ..
        } = request;
        let options = SearchOptions {
            bias,
            ..SearchOptions::default()
        };
        let handle = self.tasks.spawn(async move {
            let result = geocoder.forward_lookup(&query, &options).await;
            Completion::Search { token, result }
        });
        self.search_task = Some((token, handle));
    }

    fn locate(&mut self, automatic: bool) {
        if self.locating {
            return;
        }
        self.locating = true;
        let acquirer = Arc::clone(&self.acquirer);
        self.tasks.spawn(async move {
            let result = acquirer.acquire().await;
            Completion::Located { result, automatic }
        });
    }

    fn cancel_reverse(&mut self, obsolete: RequestToken) {
        match self.reverse_task.take() {
            Some((token, handle)) if token == obsolete => {
                if self.options.abort_stale_requests {
                    debug!(%token, "aborting superseded reverse lookup");
                    handle.abort();
                }
            }
            other => self.reverse_task = other,
        }
    }

    fn cancel_search(&mut self, obsolete: RequestToken) {
        match self.search_task.take() {
            Some((token, handle)) if token == obsolete => {
                if self.options.abort_stale_requests {
                    debug!(%token, "aborting superseded search");
                    handle.abort();
                }
            }
            other => self.search_task = other,
        }
    }

    fn forget_reverse(&mut self, token: RequestToken) {
        if matches!(self.reverse_task, Some((current, _)) if current == token) {
            self.reverse_task = None;
        }
    }

    fn forget_search(&mut self, token: RequestToken) {
        if matches!(self.search_task, Some((current, _)) if current == token) {
            self.search_task = None;
        }
    }

    fn publish(&self) {
        let next = PickerSnapshot {
            movement: self.resolver.state(),
            center: self.resolver.center(),
            address: self.resolver.address().cloned(),
            address_text: self.resolver.address_text().to_string(),
            resolve_failed: self.resolver.resolve_failed(),
            query: self.search.query().to_string(),
            candidates: self.search.candidates().to_vec(),
            panel_open: self.search.panel_open(),
            search_suppressed: self.search.is_suppressed(),
            locating: self.locating,
            location_unavailable: self.location_unavailable,
        };

        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn teardown(&mut self) {
        self.resolver.teardown();
        self.search.teardown();
        self.tasks.abort_all();
        self.reverse_task = None;
        self.search_task = None;
    }
}

/// Logs the end of a session however the task stops (closed or aborted)
struct TeardownGuard;

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        info!("picker session stopped");
    }
}
