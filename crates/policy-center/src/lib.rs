pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;
pub mod overrides;

pub use defaults::default_policy;
pub use errors::PolicyError;
pub use loader::{load_policy, load_policy_with_options, LoadOptions};
pub use model::{
    LoadedPolicy, PlacementPolicy, PolicySource, SyncPolicy, TimingPolicy, TourPolicy,
};

#[cfg(test)]
mod tests;
