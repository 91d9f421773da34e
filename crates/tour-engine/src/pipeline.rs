//! Resolve then place: one geometry frame for a step.

use parking_lot::Mutex;
use target_locator::{ResolutionKind, TargetResolver};
use tooltip_placement::{Placement, PlacementCalculator};
use tourguide_core_types::{StepDescriptor, Viewport};
use tracing::{trace, warn};

/// Geometry for one step at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub resolution: ResolutionKind,
    pub placement: Placement,
}

pub struct StepPipeline {
    resolver: TargetResolver,
    calculator: PlacementCalculator,
    last_viewport: Mutex<Viewport>,
}

impl StepPipeline {
    pub fn new(resolver: TargetResolver, calculator: PlacementCalculator) -> Self {
        Self {
            resolver,
            calculator,
            last_viewport: Mutex::new(Viewport::default()),
        }
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Recomputes everything from the live DOM. A target that cannot be
    /// found, or has no layout box, yields a centred tooltip.
    pub async fn frame(&self, step: &StepDescriptor) -> Frame {
        let viewport = self.viewport().await;
        let resolution = self.resolver.resolve(&step.target).await;
        let target = match resolution.element() {
            Some(element) => match self.resolver.dom().bounding_rect(element).await {
                Ok(rect) if !rect.is_empty() => Some(rect),
                Ok(_) => None,
                Err(err) => {
                    warn!(step = %step.id, %element, "bounding rect unavailable: {err}");
                    None
                }
            },
            None => None,
        };
        let placement = self.calculator.compute(target, step.preferred_side, &viewport);
        trace!(step = %step.id, side = %placement.side, tooltip = %placement.tooltip, "frame");
        Frame {
            resolution: resolution.kind(),
            placement,
        }
    }

    async fn viewport(&self) -> Viewport {
        match self.resolver.dom().viewport().await {
            Ok(viewport) => {
                *self.last_viewport.lock() = viewport;
                viewport
            }
            Err(err) => {
                let fallback = *self.last_viewport.lock();
                warn!("viewport unavailable, reusing {}x{}: {err}", fallback.width, fallback.height);
                fallback
            }
        }
    }
}
