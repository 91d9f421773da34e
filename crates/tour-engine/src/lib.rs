//! Guided-tour engine
//!
//! [`TourController`] owns at most one tour session. Each step change runs
//! tab synchronization, target resolution and tooltip placement, publishes a
//! [`RenderState`], then keeps tracking the target's layout until the step
//! ends.

pub mod catalog;
pub mod controller;
pub mod errors;
pub mod events;
pub mod host;
pub mod pipeline;
pub mod render;
pub mod tracking;

pub use catalog::{CatalogProvider, StaticCatalogProvider};
pub use controller::TourController;
pub use errors::EngineError;
pub use events::{CloseReason, DiscardReason, TourEvent};
pub use host::{NoopHost, TourHost};
pub use pipeline::{Frame, StepPipeline};
pub use render::{RenderState, TourPhase};
pub use tracking::{TickCounter, TrackingHandle, TrackingProbe};
