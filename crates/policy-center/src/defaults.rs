use crate::model::{PlacementPolicy, SyncPolicy, TimingPolicy, TourPolicy};

pub fn default_policy() -> TourPolicy {
    TourPolicy {
        placement: PlacementPolicy {
            highlight_padding: 4.0,
            tooltip_width: 384.0,
            max_width_ratio: 0.9,
            tooltip_height: 400.0,
            gap: 20.0,
            viewport_margin: 20.0,
            nav_rail_width: 80.0,
        },
        sync: SyncPolicy {
            max_attempts: 3,
            verify_delay_ms: 100,
            retry_delay_ms: 150,
            settle_ms: 50,
            tab_selector_template: "[data-tour-tab=\"{label}\"]".to_string(),
        },
        timing: TimingPolicy {
            completion_ms: 1_400,
            frame_interval_ms: 16,
            event_capacity: 256,
        },
    }
}

impl Default for TourPolicy {
    fn default() -> Self {
        default_policy()
    }
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        default_policy().placement
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        default_policy().sync
    }
}

impl Default for TimingPolicy {
    fn default() -> Self {
        default_policy().timing
    }
}
