//! Lifecycle notifications published on the engine's event bus.

use serde::Serialize;
use state_sync::SyncOutcome;
use target_locator::ResolutionKind;
use tourguide_core_types::{PageId, SessionId, Side};

/// Why a session ended through the cancellation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Skipped,
    Closed,
}

/// Why a session disappeared without any host callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// `open` started a new session over it.
    Replaced,
    /// The page changed to one without steps.
    NoCatalog,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TourEvent {
    Opened {
        session: SessionId,
        page: PageId,
        steps: usize,
    },
    StepChanged {
        session: SessionId,
        page: PageId,
        index: usize,
        step_id: String,
    },
    /// Geometry for the current step was (re)computed and differs from the
    /// previous publish.
    Placed {
        session: SessionId,
        index: usize,
        side: Side,
        resolution: ResolutionKind,
    },
    ActivationExhausted {
        session: SessionId,
        step_id: String,
        outcome: SyncOutcome,
    },
    Completing {
        session: SessionId,
    },
    Completed {
        session: SessionId,
    },
    Closed {
        session: SessionId,
        reason: CloseReason,
    },
    Discarded {
        session: SessionId,
        reason: DiscardReason,
    },
}

impl TourEvent {
    pub fn session(&self) -> &SessionId {
        match self {
            TourEvent::Opened { session, .. }
            | TourEvent::StepChanged { session, .. }
            | TourEvent::Placed { session, .. }
            | TourEvent::ActivationExhausted { session, .. }
            | TourEvent::Completing { session }
            | TourEvent::Completed { session }
            | TourEvent::Closed { session, .. }
            | TourEvent::Discarded { session, .. } => session,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TourEvent::Opened { .. } => "opened",
            TourEvent::StepChanged { .. } => "step_changed",
            TourEvent::Placed { .. } => "placed",
            TourEvent::ActivationExhausted { .. } => "activation_exhausted",
            TourEvent::Completing { .. } => "completing",
            TourEvent::Completed { .. } => "completed",
            TourEvent::Closed { .. } => "closed",
            TourEvent::Discarded { .. } => "discarded",
        }
    }
}
