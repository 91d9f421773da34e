//! Visible-first target resolution

use std::sync::Arc;

use serde::Serialize;
use tourguide_core_types::{ElementHandle, TargetSelector};
use tracing::{debug, warn};

use crate::port::DomPort;

/// Outcome of resolving one step target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "element", rename_all = "snake_case")]
pub enum Resolution {
    /// Whole-viewport step; nothing to look up.
    Body,
    /// First match that is laid out.
    Visible(ElementHandle),
    /// Nothing is laid out; first match returned as a best effort.
    HiddenFallback(ElementHandle),
    /// Selector matched nothing.
    NotFound,
}

/// Discriminant of [`Resolution`] without the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Body,
    Visible,
    HiddenFallback,
    NotFound,
}

impl Resolution {
    pub fn element(&self) -> Option<&ElementHandle> {
        match self {
            Resolution::Visible(element) | Resolution::HiddenFallback(element) => Some(element),
            Resolution::Body | Resolution::NotFound => None,
        }
    }

    pub fn into_element(self) -> Option<ElementHandle> {
        match self {
            Resolution::Visible(element) | Resolution::HiddenFallback(element) => Some(element),
            Resolution::Body | Resolution::NotFound => None,
        }
    }

    pub fn kind(&self) -> ResolutionKind {
        match self {
            Resolution::Body => ResolutionKind::Body,
            Resolution::Visible(_) => ResolutionKind::Visible,
            Resolution::HiddenFallback(_) => ResolutionKind::HiddenFallback,
            Resolution::NotFound => ResolutionKind::NotFound,
        }
    }
}

/// Finds the single best element for a selector.
///
/// Responsive layouts routinely render the same control twice (mobile and
/// desktop copies), so every match is inspected and the first one with a
/// layout box wins. DOM failures never escape: they resolve to `NotFound`.
#[derive(Clone)]
pub struct TargetResolver {
    dom: Arc<dyn DomPort>,
}

impl TargetResolver {
    pub fn new(dom: Arc<dyn DomPort>) -> Self {
        Self { dom }
    }

    pub fn dom(&self) -> &Arc<dyn DomPort> {
        &self.dom
    }

    pub async fn resolve(&self, target: &TargetSelector) -> Resolution {
        match target {
            TargetSelector::Body => Resolution::Body,
            TargetSelector::Query(selector) => self.resolve_query(selector).await,
        }
    }

    pub async fn resolve_query(&self, selector: &str) -> Resolution {
        let matches = match self.dom.query_all(selector).await {
            Ok(matches) => matches,
            Err(err) => {
                warn!(selector, "target query failed: {}", err);
                return Resolution::NotFound;
            }
        };

        let Some(first) = matches.first().cloned() else {
            debug!(selector, "TargetNotFound: selector matched nothing");
            return Resolution::NotFound;
        };

        for element in &matches {
            match self.dom.client_rects(element).await {
                Ok(rects) if !rects.is_empty() => {
                    debug!(selector, element = %element, "resolved visible target");
                    return Resolution::Visible(element.clone());
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(selector, element = %element, "skipping candidate: {}", err);
                }
            }
        }

        debug!(
            selector,
            candidates = matches.len(),
            "TargetNotVisible: falling back to first match"
        );
        Resolution::HiddenFallback(first)
    }
}
