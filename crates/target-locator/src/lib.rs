//! Tour target resolution
//!
//! This crate locates the DOM element a tour step points at:
//! - `DomPort`: the narrow, async view of the live document
//! - `TargetResolver`: visible-first selection among duplicate matches
//! - `FixtureDom`: an in-memory document for tests and offline simulation

pub mod errors;
pub mod fixture;
pub mod port;
pub mod resolver;

pub use errors::*;
pub use fixture::*;
pub use port::*;
pub use resolver::*;
