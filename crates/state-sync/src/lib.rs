//! External state synchronization for tour steps.
//!
//! Some tour targets only exist while a sibling tab is active. The
//! synchronizer flips that tab before the step is resolved, retrying a
//! bounded number of times and giving up quietly.

pub mod retry;
pub mod synchronizer;

pub use retry::{retry, RetryOutcome};
pub use synchronizer::{ExternalStateSynchronizer, SyncOutcome};
