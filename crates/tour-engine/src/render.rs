//! What the UI layer draws.

use serde::Serialize;
use state_sync::SyncOutcome;
use target_locator::ResolutionKind;
use tourguide_core_types::{PageId, Rect, SessionId, Side, StepDescriptor};

use crate::pipeline::Frame;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TourPhase {
    #[default]
    Closed,
    Active {
        index: usize,
    },
    /// Completion flourish is showing; the host is notified when it ends.
    Completing,
}

impl TourPhase {
    pub fn index(&self) -> Option<usize> {
        match self {
            TourPhase::Active { index } => Some(*index),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TourPhase::Closed)
    }
}

/// Snapshot published on every visible change. `revision` increases by one
/// per publish, across sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RenderState {
    pub revision: u64,
    #[serde(flatten)]
    pub phase: TourPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageId>,
    pub step_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncOutcome>,
}

impl RenderState {
    pub fn closed(revision: u64) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    pub(crate) fn apply_frame(&mut self, frame: &Frame) {
        self.highlight = frame.placement.highlight;
        self.tooltip = Some(frame.placement.tooltip);
        self.side = Some(frame.placement.side);
        self.resolution = Some(frame.resolution);
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_closed()
    }

    pub fn index(&self) -> Option<usize> {
        self.phase.index()
    }
}
