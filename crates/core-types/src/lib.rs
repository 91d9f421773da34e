//! Shared primitives for the tourguide engine crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod geometry;
pub mod step;

pub use geometry::{Rect, Side, Size, Viewport};
pub use step::{StepDescriptor, TabRequirement, TargetSelector, TourCatalog, BODY_SELECTOR};

/// Error type shared by the model crates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("unknown tooltip side: {0}")]
    InvalidSide(String),
    #[error("invalid rect: {0}")]
    InvalidRect(String),
    #[error("duplicate step id '{id}' at position {index}")]
    DuplicateStepId { id: String, index: usize },
    #[error("step at position {0} has an empty id")]
    EmptyStepId(usize),
}

/// Logical page identifier (a route path in the host dashboard).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub String);

impl PageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Trims surrounding whitespace and trailing slashes; the empty route becomes `/`.
    pub fn normalized(&self) -> Self {
        let trimmed = self.0.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            Self("/".to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one tour session for logging and events.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a live DOM node. Only valid for the lookup that produced it.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
