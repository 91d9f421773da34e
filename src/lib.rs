//! Tourguide CLI
//!
//! Developer tooling around the guided-tour engine: offline tour simulation
//! against fixture documents, one-shot placement, catalog validation and
//! policy inspection.

pub mod cli;
pub mod script;

pub use script::{parse_script, ScriptCommand, ScriptError};
