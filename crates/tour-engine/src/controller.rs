//! Tour session state machine.
//!
//! Navigation calls are synchronous: they mutate the session under one lock
//! and hand the slow parts (tab activation, resolution, tracking, completion
//! delay) to tasks spawned on the current tokio runtime. Every task carries
//! a [`Ticket`] and re-checks it under the lock before touching state, so a
//! task outliving its step or session is a no-op even if it escapes
//! cancellation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use state_sync::{ExternalStateSynchronizer, SyncOutcome};
use target_locator::{DomPort, TargetResolver};
use tokio::select;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tooltip_placement::PlacementCalculator;
use tourguide_core_types::{PageId, SessionId, StepDescriptor, TourCatalog};
use tourguide_event_bus::{EventBus, InMemoryBus};
use tourguide_policy_center::{TimingPolicy, TourPolicy};
use tracing::{debug, info};

use crate::catalog::CatalogProvider;
use crate::events::{CloseReason, DiscardReason, TourEvent};
use crate::host::TourHost;
use crate::pipeline::{Frame, StepPipeline};
use crate::render::{RenderState, TourPhase};
use crate::tracking::{TickCounter, TrackingHandle, TrackingProbe};

/// Identifies the session and step a task was spawned for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Ticket {
    generation: u64,
    epoch: u64,
}

struct Session {
    id: SessionId,
    generation: u64,
    page: PageId,
    catalog: Arc<TourCatalog>,
    /// Never `Closed`: a closed tour has no session.
    phase: TourPhase,
    /// Bumped on every step change and on completion.
    epoch: u64,
    token: CancellationToken,
    step_task: Option<TrackingHandle>,
    completion: Option<TrackingHandle>,
    last_frame: Option<Frame>,
    sync: Option<SyncOutcome>,
}

impl Session {
    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            epoch: self.epoch,
        }
    }

    fn current_step(&self) -> Option<&StepDescriptor> {
        self.phase.index().and_then(|index| self.catalog.get(index))
    }

    fn render(&self, revision: u64) -> RenderState {
        let mut render = RenderState {
            revision,
            phase: self.phase,
            session: Some(self.id.clone()),
            page: Some(self.page.clone()),
            step_count: self.catalog.len(),
            step: self.current_step().cloned(),
            sync: self.sync,
            ..RenderState::default()
        };
        if let Some(frame) = &self.last_frame {
            render.apply_frame(frame);
        }
        render
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(Default)]
struct ControllerState {
    generation: u64,
    revision: u64,
    session: Option<Session>,
}

impl ControllerState {
    /// The session, only if `ticket` still names its current step.
    fn current(&mut self, ticket: Ticket) -> Option<&mut Session> {
        self.session
            .as_mut()
            .filter(|session| session.ticket() == ticket)
    }

    /// Phase and step count of the running session.
    fn position(&self) -> Option<(TourPhase, usize)> {
        self.session
            .as_ref()
            .map(|session| (session.phase, session.catalog.len()))
    }
}

struct Inner {
    provider: Arc<dyn CatalogProvider>,
    pipeline: StepPipeline,
    synchronizer: ExternalStateSynchronizer,
    host: Arc<dyn TourHost>,
    bus: Arc<InMemoryBus<TourEvent>>,
    render: watch::Sender<RenderState>,
    timing: TimingPolicy,
    settle: Duration,
    /// Parent of every session token; cancelled when the last controller
    /// handle is dropped.
    root: CancellationToken,
    state: Mutex<ControllerState>,
}

/// Drives one tour at a time for an embedding page.
///
/// Cloning is cheap; clones share the same session. Background work stops
/// once every clone is dropped.
#[derive(Clone)]
pub struct TourController {
    inner: Arc<Inner>,
    _shutdown: Arc<DropGuard>,
}

impl TourController {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        dom: Arc<dyn DomPort>,
        host: Arc<dyn TourHost>,
        policy: &TourPolicy,
    ) -> Self {
        let resolver = TargetResolver::new(dom);
        let (render, _) = watch::channel(RenderState::default());
        let root = CancellationToken::new();
        let shutdown = Arc::new(root.clone().drop_guard());
        let inner = Inner {
            provider,
            pipeline: StepPipeline::new(
                resolver.clone(),
                PlacementCalculator::new(policy.placement.clone()),
            ),
            synchronizer: ExternalStateSynchronizer::new(resolver, policy.sync.clone()),
            host,
            bus: InMemoryBus::new(policy.timing.event_capacity),
            render,
            timing: policy.timing.clone(),
            settle: policy.sync.settle(),
            root,
            state: Mutex::new(ControllerState::default()),
        };
        Self {
            inner: Arc::new(inner),
            _shutdown: shutdown,
        }
    }

    /// Starts a tour for `page`, replacing any running session. Returns
    /// `false` when the page has no steps; the tour is then closed.
    pub fn open(&self, page: impl Into<PageId>) -> bool {
        let page = page.into().normalized();
        let catalog = self.inner.provider.catalog(&page);
        let mut state = self.inner.state.lock();

        if state.session.is_some() {
            let reason = if catalog.is_empty() {
                DiscardReason::NoCatalog
            } else {
                DiscardReason::Replaced
            };
            self.inner.discard(&mut state, reason);
        }
        if catalog.is_empty() {
            debug!(%page, "no tour steps for page");
            return false;
        }

        state.generation += 1;
        let session = Session {
            id: SessionId::new(),
            generation: state.generation,
            page,
            catalog,
            phase: TourPhase::Active { index: 0 },
            epoch: 0,
            token: self.inner.root.child_token(),
            step_task: None,
            completion: None,
            last_frame: None,
            sync: None,
        };
        info!(
            session = %session.id,
            page = %session.page,
            generation = session.generation,
            steps = session.catalog.len(),
            "tour opened"
        );
        self.inner.bus.emit(TourEvent::Opened {
            session: session.id.clone(),
            page: session.page.clone(),
            steps: session.catalog.len(),
        });
        state.session = Some(session);
        self.inner.start_step(&mut state, 0);
        true
    }

    /// Advances one step; on the last step starts the completion flourish.
    pub fn next(&self) {
        let mut state = self.inner.state.lock();
        let Some((phase, len)) = state.position() else {
            return;
        };
        match phase {
            TourPhase::Active { index } if index + 1 < len => {
                self.inner.start_step(&mut state, index + 1);
            }
            TourPhase::Active { .. } => self.inner.begin_completion(&mut state),
            TourPhase::Completing | TourPhase::Closed => {}
        }
    }

    pub fn previous(&self) {
        let mut state = self.inner.state.lock();
        if let Some((TourPhase::Active { index }, _)) = state.position() {
            if index > 0 {
                self.inner.start_step(&mut state, index - 1);
            }
        }
    }

    /// Jumps to `index`. Out-of-range targets and the current step are
    /// ignored.
    pub fn go_to(&self, index: usize) -> bool {
        let mut state = self.inner.state.lock();
        match state.position() {
            Some((TourPhase::Active { index: current }, len)) if current != index && index < len => {
                self.inner.start_step(&mut state, index);
                true
            }
            _ => false,
        }
    }

    pub fn skip(&self) -> bool {
        self.inner.close(CloseReason::Skipped)
    }

    pub fn close(&self) -> bool {
        self.inner.close(CloseReason::Closed)
    }

    /// The host navigated. A running tour restarts at step 0 of the new
    /// page's catalog, or is dropped silently when that page has none.
    pub fn page_changed(&self, page: impl Into<PageId>) {
        let page = page.into().normalized();
        let catalog = self.inner.provider.catalog(&page);
        let mut state = self.inner.state.lock();
        let Some(session) = state.session.as_mut() else {
            return;
        };
        if session.page == page {
            return;
        }
        if catalog.is_empty() {
            self.inner.discard(&mut state, DiscardReason::NoCatalog);
            return;
        }
        // the flourish belongs to the page the tour finished on
        if let Some(timer) = session.completion.take() {
            debug!(session = %session.id, %page, "completion cancelled by page change");
            timer.cancel();
        }
        info!(session = %session.id, from = %session.page, to = %page, "tour page changed");
        session.page = page;
        session.catalog = catalog;
        self.inner.start_step(&mut state, 0);
    }

    /// Re-runs resolution and placement for the current step, e.g. after a
    /// resize. Ignored while the step is still synchronizing; that run will
    /// read the new viewport anyway.
    pub fn viewport_changed(&self) {
        let state = self.inner.state.lock();
        let Some(session) = state.session.as_ref() else {
            return;
        };
        let (Some(step), Some(task)) = (session.current_step(), session.step_task.as_ref()) else {
            return;
        };
        if session.sync.is_none() {
            return;
        }
        let step = step.clone();
        let ticket = session.ticket();
        let token = task.child_token();
        drop(state);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            select! {
                biased;
                _ = token.cancelled() => {}
                _ = inner.refresh(ticket, &step) => {}
            }
        });
    }

    pub fn phase(&self) -> TourPhase {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .map(|session| session.phase)
            .unwrap_or_default()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.state.lock().session.as_ref().map(|s| s.id.clone())
    }

    pub fn page(&self) -> Option<PageId> {
        self.inner.state.lock().session.as_ref().map(|s| s.page.clone())
    }

    /// Number of sessions opened so far.
    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.inner.render.subscribe()
    }

    pub fn render_state(&self) -> RenderState {
        self.inner.render.borrow().clone()
    }

    pub fn events(&self) -> broadcast::Receiver<TourEvent> {
        self.inner.bus.subscribe()
    }

    pub fn event_bus(&self) -> Arc<InMemoryBus<TourEvent>> {
        Arc::clone(&self.inner.bus)
    }

    /// Probe for the current step's sync/track task.
    pub fn tracking_probe(&self) -> Option<TrackingProbe> {
        let state = self.inner.state.lock();
        state
            .session
            .as_ref()
            .and_then(|session| session.step_task.as_ref())
            .map(TrackingHandle::probe)
    }

    /// Probe for the pending completion timer.
    pub fn completion_probe(&self) -> Option<TrackingProbe> {
        let state = self.inner.state.lock();
        state
            .session
            .as_ref()
            .and_then(|session| session.completion.as_ref())
            .map(TrackingHandle::probe)
    }
}

impl Inner {
    fn publish(&self, state: &mut ControllerState) {
        state.revision += 1;
        let render = match &state.session {
            Some(session) => session.render(state.revision),
            None => RenderState::closed(state.revision),
        };
        self.render.send_replace(render);
    }

    fn start_step(self: &Arc<Self>, state: &mut ControllerState, index: usize) {
        let Some(session) = state.session.as_mut() else {
            return;
        };
        let Some(step) = session.catalog.get(index).cloned() else {
            return;
        };
        if let Some(previous) = session.step_task.take() {
            previous.cancel();
        }
        session.epoch += 1;
        session.phase = TourPhase::Active { index };
        session.last_frame = None;
        session.sync = None;

        info!(
            session = %session.id,
            page = %session.page,
            index,
            step = %step.id,
            "tour step"
        );
        self.bus.emit(TourEvent::StepChanged {
            session: session.id.clone(),
            page: session.page.clone(),
            index,
            step_id: step.id.clone(),
        });

        let ticket = session.ticket();
        let inner = Arc::clone(self);
        session.step_task = Some(TrackingHandle::spawn(
            session.token.child_token(),
            move |ticks| inner.run_step(ticket, step, ticks),
        ));
    }

    /// Synchronize, resolve, place, publish; then track layout while the step
    /// points into the DOM.
    async fn run_step(self: Arc<Self>, ticket: Ticket, step: StepDescriptor, ticks: TickCounter) {
        let outcome = self.synchronizer.ensure_visible(&step).await;
        if !self.record_sync(ticket, &step, outcome) {
            return;
        }
        if !self.refresh(ticket, &step).await {
            return;
        }
        if outcome.changed_dom() {
            sleep(self.settle).await;
            if !self.refresh(ticket, &step).await {
                return;
            }
        }
        if step.target.is_body() {
            return;
        }

        let mut frames = interval(self.timing.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        frames.tick().await;
        loop {
            frames.tick().await;
            ticks.tick();
            if !self.refresh(ticket, &step).await {
                debug!(step = %step.id, "tracking loop stale, stopping");
                break;
            }
        }
    }

    fn record_sync(&self, ticket: Ticket, step: &StepDescriptor, outcome: SyncOutcome) -> bool {
        let mut state = self.state.lock();
        let Some(session) = state.current(ticket) else {
            return false;
        };
        session.sync = Some(outcome);
        if outcome.gave_up() {
            self.bus.emit(TourEvent::ActivationExhausted {
                session: session.id.clone(),
                step_id: step.id.clone(),
                outcome,
            });
        }
        true
    }

    /// One pipeline pass. Returns `false` once the ticket is stale.
    async fn refresh(&self, ticket: Ticket, step: &StepDescriptor) -> bool {
        let frame = self.pipeline.frame(step).await;
        self.commit_frame(ticket, frame)
    }

    fn commit_frame(&self, ticket: Ticket, frame: Frame) -> bool {
        let mut state = self.state.lock();
        let event = {
            let Some(session) = state.current(ticket) else {
                return false;
            };
            let Some(index) = session.phase.index() else {
                return false;
            };
            if session.last_frame == Some(frame) {
                return true;
            }
            session.last_frame = Some(frame);
            TourEvent::Placed {
                session: session.id.clone(),
                index,
                side: frame.placement.side,
                resolution: frame.resolution,
            }
        };
        self.publish(&mut state);
        self.bus.emit(event);
        true
    }

    fn begin_completion(self: &Arc<Self>, state: &mut ControllerState) {
        let Some(session) = state.session.as_mut() else {
            return;
        };
        if let Some(task) = session.step_task.take() {
            task.cancel();
        }
        session.epoch += 1;
        session.phase = TourPhase::Completing;

        let ticket = session.ticket();
        let delay = self.timing.completion();
        let inner = Arc::clone(self);
        session.completion = Some(TrackingHandle::spawn(
            session.token.child_token(),
            move |_| async move {
                sleep(delay).await;
                inner.finish_completion(ticket);
            },
        ));
        info!(session = %session.id, delay_ms = delay.as_millis() as u64, "tour completing");
        let event = TourEvent::Completing {
            session: session.id.clone(),
        };
        self.publish(state);
        self.bus.emit(event);
    }

    fn finish_completion(&self, ticket: Ticket) {
        let finished = {
            let mut state = self.state.lock();
            match state.current(ticket) {
                Some(session) if session.phase == TourPhase::Completing => {}
                _ => return,
            }
            let session = state.session.take();
            self.publish(&mut state);
            if let Some(session) = &session {
                info!(session = %session.id, page = %session.page, "tour completed");
                self.bus.emit(TourEvent::Completed {
                    session: session.id.clone(),
                });
            }
            session
        };
        if let Some(session) = finished {
            drop(session);
            self.host.on_complete();
        }
    }

    fn close(&self, reason: CloseReason) -> bool {
        let closed = {
            let mut state = self.state.lock();
            match state.session.as_ref().map(|s| s.phase) {
                Some(TourPhase::Active { .. }) => {}
                Some(TourPhase::Completing) => {
                    debug!(?reason, "close during completion ignored");
                    return false;
                }
                _ => return false,
            }
            let session = state.session.take();
            self.publish(&mut state);
            if let Some(session) = &session {
                info!(session = %session.id, page = %session.page, ?reason, "tour closed");
                self.bus.emit(TourEvent::Closed {
                    session: session.id.clone(),
                    reason,
                });
            }
            session
        };
        if let Some(session) = closed {
            drop(session);
            self.host.on_close();
        }
        true
    }

    /// Drops the session without host callbacks.
    fn discard(&self, state: &mut ControllerState, reason: DiscardReason) {
        let Some(session) = state.session.take() else {
            return;
        };
        info!(session = %session.id, page = %session.page, ?reason, "tour session discarded");
        self.bus.emit(TourEvent::Discarded {
            session: session.id.clone(),
            reason,
        });
        drop(session);
        self.publish(state);
    }
}
