//! The engine's only window onto the document.

use async_trait::async_trait;
use tourguide_core_types::{ElementHandle, Rect, Viewport};

use crate::errors::DomError;

/// Read-mostly access to the live DOM.
///
/// Rects are client (viewport-relative) coordinates, as returned by
/// `getClientRects`. Only `activate` writes to the document.
#[async_trait]
pub trait DomPort: Send + Sync {
    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError>;

    /// Layout boxes of the element; empty when it is not rendered.
    async fn client_rects(&self, element: &ElementHandle) -> Result<Vec<Rect>, DomError>;

    /// Bounding box of the element.
    async fn bounding_rect(&self, element: &ElementHandle) -> Result<Rect, DomError>;

    /// Whether a tab-like control reports itself active (`data-state="active"`).
    async fn is_active(&self, element: &ElementHandle) -> Result<bool, DomError>;

    /// Programmatic click.
    async fn activate(&self, element: &ElementHandle) -> Result<(), DomError>;

    async fn viewport(&self) -> Result<Viewport, DomError>;
}
