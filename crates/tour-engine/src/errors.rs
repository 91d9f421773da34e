use std::path::PathBuf;

use thiserror::Error;
use tourguide_core_types::CoreError;

/// Failures while loading tour content. Runtime navigation never errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(String),

    #[error("invalid catalog for page '{page}': {source}")]
    Catalog {
        page: String,
        #[source]
        source: CoreError,
    },

    #[error("page '{0}' is defined more than once after normalization")]
    DuplicatePage(String),
}

impl EngineError {
    pub fn parse(err: impl std::fmt::Display) -> Self {
        EngineError::Parse(err.to_string())
    }
}
