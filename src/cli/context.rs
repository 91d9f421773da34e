use std::path::{Path, PathBuf};

use tourguide_policy_center::{LoadedPolicy, TourPolicy};

use super::output::OutputFormat;

pub struct CliContext {
    loaded: LoadedPolicy,
    policy_path: Option<PathBuf>,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(loaded: LoadedPolicy, policy_path: Option<PathBuf>, output: OutputFormat) -> Self {
        Self {
            loaded,
            policy_path,
            output,
        }
    }

    pub fn policy(&self) -> &TourPolicy {
        &self.loaded.policy
    }

    pub fn loaded_policy(&self) -> &LoadedPolicy {
        &self.loaded
    }

    pub fn policy_path(&self) -> Option<&Path> {
        self.policy_path.as_deref()
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }
}
