//! In-memory document used by tests and the simulator.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tourguide_core_types::{ElementHandle, Rect, Viewport};
use tracing::trace;

use crate::errors::DomError;
use crate::port::DomPort;

/// How a tab-like element reacts to programmatic clicks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Immediate,
    /// Becomes active once it has been clicked this many times.
    AfterClicks(u32),
    Never,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureElement {
    pub id: String,
    /// Selector strings this element answers to, matched verbatim.
    pub selectors: Vec<String>,
    #[serde(default)]
    pub rects: Vec<Rect>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub activation: Activation,
    /// Elements sharing a group behave like one tab list.
    #[serde(default)]
    pub group: Option<String>,
    /// Id of the tab whose panel holds this element; laid out only while
    /// that tab is active.
    #[serde(default)]
    pub shown_by: Option<String>,
}

impl FixtureElement {
    pub fn new<I, S>(id: impl Into<String>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            selectors: selectors.into_iter().map(Into::into).collect(),
            rects: Vec::new(),
            active: false,
            activation: Activation::default(),
            group: None,
            shown_by: None,
        }
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rects.push(rect);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn shown_by(mut self, tab: impl Into<String>) -> Self {
        self.shown_by = Some(tab.into());
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureSpec {
    pub viewport: Viewport,
    #[serde(default)]
    pub elements: Vec<FixtureElement>,
}

#[derive(Debug)]
struct FixtureState {
    viewport: Viewport,
    elements: Vec<FixtureElement>,
    clicks: HashMap<String, u32>,
    queries: Vec<String>,
}

impl FixtureState {
    fn element(&self, id: &str) -> Result<&FixtureElement, DomError> {
        self.elements
            .iter()
            .find(|element| element.id == id)
            .ok_or_else(|| DomError::Detached(id.to_string()))
    }

    /// Rects as laid out right now; empty while the owning panel is hidden.
    fn layout(&self, id: &str) -> Result<&[Rect], DomError> {
        let element = self.element(id)?;
        let shown = match &element.shown_by {
            Some(tab) => self.elements.iter().any(|e| &e.id == tab && e.active),
            None => true,
        };
        Ok(if shown {
            &element.rects[..]
        } else {
            &element.rects[..0]
        })
    }

    fn element_mut(&mut self, id: &str) -> Result<&mut FixtureElement, DomError> {
        self.elements
            .iter_mut()
            .find(|element| element.id == id)
            .ok_or_else(|| DomError::Detached(id.to_string()))
    }
}

/// A scripted document: elements in document order, matched by literal
/// selector strings. Records every query so callers can assert traffic.
#[derive(Debug)]
pub struct FixtureDom {
    state: Mutex<FixtureState>,
}

impl FixtureDom {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: Mutex::new(FixtureState {
                viewport,
                elements: Vec::new(),
                clicks: HashMap::new(),
                queries: Vec::new(),
            }),
        }
    }

    pub fn from_spec(spec: FixtureSpec) -> Self {
        let dom = Self::new(spec.viewport);
        for element in spec.elements {
            dom.insert(element);
        }
        dom
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, DomError> {
        let spec: FixtureSpec =
            serde_yaml::from_str(raw).map_err(|err| DomError::Fixture(err.to_string()))?;
        Ok(Self::from_spec(spec))
    }

    /// Loads a YAML (or JSON) fixture file.
    pub fn load(path: &Path) -> Result<Self, DomError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| DomError::Fixture(format!("{}: {}", path.display(), err)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn with_element(self, element: FixtureElement) -> Self {
        self.insert(element);
        self
    }

    /// Appends an element, replacing any element with the same id in place.
    pub fn insert(&self, element: FixtureElement) {
        let mut state = self.state.lock();
        match state.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => state.elements.push(element),
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.elements.len();
        state.elements.retain(|element| element.id != id);
        state.elements.len() != before
    }

    pub fn set_rects(&self, id: &str, rects: Vec<Rect>) -> Result<(), DomError> {
        self.state.lock().element_mut(id)?.rects = rects;
        Ok(())
    }

    pub fn set_active(&self, id: &str, active: bool) -> Result<(), DomError> {
        self.state.lock().element_mut(id)?.active = active;
        Ok(())
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.lock().viewport = viewport;
    }

    pub fn element_active(&self, id: &str) -> Option<bool> {
        self.state.lock().element(id).ok().map(|element| element.active)
    }

    pub fn clicks(&self, id: &str) -> u32 {
        self.state.lock().clicks.get(id).copied().unwrap_or(0)
    }

    pub fn query_log(&self) -> Vec<String> {
        self.state.lock().queries.clone()
    }

    pub fn query_count(&self, selector: &str) -> usize {
        self.state
            .lock()
            .queries
            .iter()
            .filter(|query| query.as_str() == selector)
            .count()
    }

    pub fn clear_query_log(&self) {
        self.state.lock().queries.clear();
    }
}

#[async_trait]
impl DomPort for FixtureDom {
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        if selector.trim().is_empty() {
            return Err(DomError::InvalidSelector(selector.to_string()));
        }
        let mut state = self.state.lock();
        state.queries.push(selector.to_string());
        Ok(state
            .elements
            .iter()
            .filter(|element| element.selectors.iter().any(|s| s == selector))
            .map(|element| ElementHandle::new(element.id.clone()))
            .collect())
    }

    async fn client_rects(&self, element: &ElementHandle) -> Result<Vec<Rect>, DomError> {
        Ok(self.state.lock().layout(&element.0)?.to_vec())
    }

    async fn bounding_rect(&self, element: &ElementHandle) -> Result<Rect, DomError> {
        let state = self.state.lock();
        let rects = state.layout(&element.0)?;
        Ok(Rect::bounding(rects).unwrap_or(Rect::ZERO))
    }

    async fn is_active(&self, element: &ElementHandle) -> Result<bool, DomError> {
        Ok(self.state.lock().element(&element.0)?.active)
    }

    async fn activate(&self, element: &ElementHandle) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let clicks = {
            let counter = state.clicks.entry(element.0.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let target = state.element_mut(&element.0)?;
        let becomes_active = match target.activation {
            Activation::Immediate => true,
            Activation::AfterClicks(needed) => clicks >= needed,
            Activation::Never => false,
        };
        trace!(element = %element, clicks, becomes_active, "fixture click");
        if !becomes_active {
            return Ok(());
        }
        target.active = true;
        if let Some(group) = target.group.clone() {
            for other in state.elements.iter_mut() {
                if other.id != element.0 && other.group.as_deref() == Some(group.as_str()) {
                    other.active = false;
                }
            }
        }
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport, DomError> {
        Ok(self.state.lock().viewport)
    }
}
