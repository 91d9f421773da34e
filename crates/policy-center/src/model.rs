use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;

/// Everything the engine lets operators tune.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourPolicy {
    pub placement: PlacementPolicy,
    pub sync: SyncPolicy,
    pub timing: TimingPolicy,
}

/// Tooltip geometry constants, in CSS pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementPolicy {
    pub highlight_padding: f64,
    pub tooltip_width: f64,
    /// Upper bound on tooltip width as a fraction of the viewport width.
    pub max_width_ratio: f64,
    /// Assumed tooltip height; the real height is unknown before render.
    pub tooltip_height: f64,
    /// Distance between the target edge and the tooltip.
    pub gap: f64,
    /// Minimum distance kept from the viewport edges.
    pub viewport_margin: f64,
    /// Width of the left navigation rail; `0` disables the rail override.
    pub nav_rail_width: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    pub max_attempts: u8,
    /// Wait between a tab click and reading its active state.
    pub verify_delay_ms: u64,
    /// Wait between two failed activation attempts.
    pub retry_delay_ms: u64,
    /// Layout settle time before re-placing after a successful activation.
    pub settle_ms: u64,
    /// Selector for a tab control; `{label}` is replaced by the tab label.
    pub tab_selector_template: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingPolicy {
    pub completion_ms: u64,
    pub frame_interval_ms: u64,
    pub event_capacity: usize,
}

impl SyncPolicy {
    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn tab_selector(&self, label: &str) -> String {
        self.tab_selector_template.replace("{label}", label)
    }
}

impl TimingPolicy {
    pub fn completion(&self) -> Duration {
        Duration::from_millis(self.completion_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

impl TourPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let placement = &self.placement;
        if !(placement.tooltip_width > 0.0 && placement.tooltip_height > 0.0) {
            return Err(PolicyError::Invalid(
                "placement tooltip size must be positive".into(),
            ));
        }
        if !(placement.max_width_ratio > 0.0 && placement.max_width_ratio <= 1.0) {
            return Err(PolicyError::Invalid(format!(
                "placement.max_width_ratio must be in (0, 1], got {}",
                placement.max_width_ratio
            )));
        }
        for (name, value) in [
            ("highlight_padding", placement.highlight_padding),
            ("gap", placement.gap),
            ("viewport_margin", placement.viewport_margin),
            ("nav_rail_width", placement.nav_rail_width),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::Invalid(format!(
                    "placement.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.sync.max_attempts == 0 {
            return Err(PolicyError::Invalid(
                "sync.max_attempts must be at least 1".into(),
            ));
        }
        if !self.sync.tab_selector_template.contains("{label}") {
            return Err(PolicyError::Invalid(
                "sync.tab_selector_template must contain {label}".into(),
            ));
        }
        if self.timing.frame_interval_ms == 0 {
            return Err(PolicyError::Invalid(
                "timing.frame_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    Builtin,
    File,
    Env,
}

/// A policy together with where each leaf value came from.
#[derive(Clone, Debug, Serialize)]
pub struct LoadedPolicy {
    pub policy: TourPolicy,
    pub provenance: BTreeMap<String, PolicySource>,
}
