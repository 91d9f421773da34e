use serde_json::Value;

use crate::errors::PolicyError;
use crate::model::TourPolicy;

/// Writes one dotted-path value into the policy. Returns whether it changed.
pub fn apply_override(
    policy: &mut TourPolicy,
    path: &str,
    value: &Value,
) -> Result<bool, PolicyError> {
    let changed = match path {
        "placement.highlight_padding" => {
            merge(&mut policy.placement.highlight_padding, to_f64(value)?)
        }
        "placement.tooltip_width" => merge(&mut policy.placement.tooltip_width, to_f64(value)?),
        "placement.max_width_ratio" => {
            merge(&mut policy.placement.max_width_ratio, to_f64(value)?)
        }
        "placement.tooltip_height" => merge(&mut policy.placement.tooltip_height, to_f64(value)?),
        "placement.gap" => merge(&mut policy.placement.gap, to_f64(value)?),
        "placement.viewport_margin" => {
            merge(&mut policy.placement.viewport_margin, to_f64(value)?)
        }
        "placement.nav_rail_width" => merge(&mut policy.placement.nav_rail_width, to_f64(value)?),
        "sync.max_attempts" => merge(&mut policy.sync.max_attempts, to_u8(value)?),
        "sync.verify_delay_ms" => merge(&mut policy.sync.verify_delay_ms, to_u64(value)?),
        "sync.retry_delay_ms" => merge(&mut policy.sync.retry_delay_ms, to_u64(value)?),
        "sync.settle_ms" => merge(&mut policy.sync.settle_ms, to_u64(value)?),
        "sync.tab_selector_template" => {
            merge(&mut policy.sync.tab_selector_template, to_string(value)?)
        }
        "timing.completion_ms" => merge(&mut policy.timing.completion_ms, to_u64(value)?),
        "timing.frame_interval_ms" => merge(&mut policy.timing.frame_interval_ms, to_u64(value)?),
        "timing.event_capacity" => merge(&mut policy.timing.event_capacity, to_usize(value)?),
        path => return Err(PolicyError::UnsupportedPath(path.to_string())),
    };
    Ok(changed)
}

fn merge<T: PartialEq>(target: &mut T, candidate: T) -> bool {
    if *target == candidate {
        return false;
    }
    *target = candidate;
    true
}

fn to_f64(value: &Value) -> Result<f64, PolicyError> {
    value
        .as_f64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected number, got {value}")))
}

fn to_u64(value: &Value) -> Result<u64, PolicyError> {
    value
        .as_u64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected unsigned integer, got {value}")))
}

fn to_usize(value: &Value) -> Result<usize, PolicyError> {
    to_u64(value).and_then(|v| {
        usize::try_from(v).map_err(|_| PolicyError::InvalidValue(format!("value {v} exceeds usize")))
    })
}

fn to_u8(value: &Value) -> Result<u8, PolicyError> {
    to_u64(value).and_then(|v| {
        u8::try_from(v).map_err(|_| PolicyError::InvalidValue(format!("value {v} exceeds u8")))
    })
}

fn to_string(value: &Value) -> Result<String, PolicyError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected string, got {value}")))
}
