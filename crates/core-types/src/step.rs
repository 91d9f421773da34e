//! Tour step descriptors and per-page catalogs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geometry::Side;
use crate::CoreError;

/// Selector sentinel for whole-viewport steps.
pub const BODY_SELECTOR: &str = "body";

/// What a step points at.
///
/// Serialized as a plain string: `"body"` (or an empty string) is the
/// whole-viewport sentinel, anything else is a DOM query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetSelector {
    Body,
    Query(String),
}

impl TargetSelector {
    pub fn query(selector: impl Into<String>) -> Self {
        Self::from(selector.into())
    }

    pub fn is_body(&self) -> bool {
        matches!(self, TargetSelector::Body)
    }

    pub fn as_query(&self) -> Option<&str> {
        match self {
            TargetSelector::Body => None,
            TargetSelector::Query(selector) => Some(selector),
        }
    }
}

impl From<String> for TargetSelector {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == BODY_SELECTOR {
            TargetSelector::Body
        } else {
            TargetSelector::Query(trimmed.to_string())
        }
    }
}

impl From<TargetSelector> for String {
    fn from(value: TargetSelector) -> Self {
        match value {
            TargetSelector::Body => BODY_SELECTOR.to_string(),
            TargetSelector::Query(selector) => selector,
        }
    }
}

/// Tab that must be active before the step target is mounted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRequirement {
    pub label: String,
}

impl TabRequirement {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub id: String,
    pub target: TargetSelector,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preferred_side: Side,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_tab: Option<TabRequirement>,
}

impl StepDescriptor {
    pub fn new(id: impl Into<String>, target: TargetSelector, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target,
            title: title.into(),
            description: String::new(),
            preferred_side: Side::default(),
            category: String::new(),
            tips: Vec::new(),
            next_action_hint: None,
            requires_tab: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.preferred_side = side;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tips.push(tip.into());
        self
    }

    pub fn with_next_action_hint(mut self, hint: impl Into<String>) -> Self {
        self.next_action_hint = Some(hint.into());
        self
    }

    pub fn requiring_tab(mut self, label: impl Into<String>) -> Self {
        self.requires_tab = Some(TabRequirement::new(label));
        self
    }
}

/// Ordered steps for one page. Empty means the engine stays inert there.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StepDescriptor>", into = "Vec<StepDescriptor>")]
pub struct TourCatalog {
    steps: Vec<StepDescriptor>,
}

impl TourCatalog {
    /// Builds a catalog, rejecting empty or duplicate step ids.
    pub fn new(steps: Vec<StepDescriptor>) -> Result<Self, CoreError> {
        let mut seen = HashSet::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                return Err(CoreError::EmptyStepId(index));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(CoreError::DuplicateStepId {
                    id: step.id.clone(),
                    index,
                });
            }
        }
        Ok(Self { steps })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepDescriptor> {
        self.steps.get(index)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.steps.iter()
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }
}

impl TryFrom<Vec<StepDescriptor>> for TourCatalog {
    type Error = CoreError;

    fn try_from(value: Vec<StepDescriptor>) -> Result<Self, Self::Error> {
        TourCatalog::new(value)
    }
}

impl From<TourCatalog> for Vec<StepDescriptor> {
    fn from(value: TourCatalog) -> Self {
        value.steps
    }
}
