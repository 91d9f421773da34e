//! Cancellable background work tied to one step or one session.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Observer for a tracked task that outlives the handle itself.
#[derive(Clone, Debug)]
pub struct TrackingProbe {
    token: CancellationToken,
    ticks: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl TrackingProbe {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            ticks: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task body has returned or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Tracking iterations run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

/// Counter handed to the task body; one `tick` per tracking iteration.
#[derive(Clone, Debug)]
pub struct TickCounter(Arc<AtomicU64>);

impl TickCounter {
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// A spawned task racing its cancellation token. Dropping the handle cancels
/// the task.
#[derive(Debug)]
pub struct TrackingHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    probe: TrackingProbe,
}

impl TrackingHandle {
    /// Spawns `body` on the current runtime. Panics outside a tokio runtime,
    /// like `tokio::spawn`.
    pub fn spawn<F, Fut>(token: CancellationToken, body: F) -> Self
    where
        F: FnOnce(TickCounter) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let probe = TrackingProbe::new(token.clone());
        let work = body(TickCounter(Arc::clone(&probe.ticks)));
        let shutdown = token.clone();
        let finished = Arc::clone(&probe.finished);
        let task = tokio::spawn(async move {
            select! {
                biased;
                _ = shutdown.cancelled() => {}
                _ = work => {}
            }
            finished.store(true, Ordering::Release);
        });
        Self { token, task, probe }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Token for short-lived work that must die with this task.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn probe(&self) -> TrackingProbe {
        self.probe.clone()
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
