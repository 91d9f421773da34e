//! Error types for DOM access

use thiserror::Error;

/// DOM port error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Element handle no longer refers to a mounted node
    #[error("Element detached: {0}")]
    Detached(String),

    /// Selector rejected by the document
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Fixture document could not be loaded
    #[error("Fixture error: {0}")]
    Fixture(String),

    /// Transport or host failure
    #[error("DOM port error: {0}")]
    Port(String),
}

impl DomError {
    /// Detached nodes are expected while the host re-renders.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomError::Detached(_) | DomError::Port(_))
    }
}
