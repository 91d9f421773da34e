//! Tooltip placement for tour steps.
//!
//! # Invariants
//!
//! 1. Output depends only on the inputs: identical inputs give identical output.
//! 2. The tooltip always fits horizontally inside the viewport margins. A
//!    viewport narrower than two margins shrinks the margin to half its width.
//! 3. A `top` tooltip that would leave the viewport flips to `bottom` and
//!    vice versa; every other vertical overflow is clamped.
//!
//! Targets come in client (viewport) coordinates; results are returned in
//! document coordinates, i.e. shifted by the viewport scroll offset.

use serde::Serialize;
use tourguide_core_types::{Rect, Side, Size, Viewport};
use tourguide_policy_center::PlacementPolicy;
use tracing::trace;

/// Geometry for one rendered step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Placement {
    /// Outline around the target; `None` for whole-viewport steps.
    pub highlight: Option<Rect>,
    pub tooltip: Rect,
    /// Side actually used after rail override and flips.
    pub side: Side,
}

/// Stateless calculator bound to one placement policy.
#[derive(Clone, Debug, Default)]
pub struct PlacementCalculator {
    policy: PlacementPolicy,
}

impl PlacementCalculator {
    pub fn new(policy: PlacementPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PlacementPolicy {
        &self.policy
    }

    pub fn compute(&self, target: Option<Rect>, preferred: Side, viewport: &Viewport) -> Placement {
        compute_placement(target, preferred, viewport, &self.policy)
    }
}

/// Tooltip box size for a viewport: the configured width, capped by the width
/// ratio and by what fits between the horizontal margins.
pub fn tooltip_size(viewport: &Viewport, policy: &PlacementPolicy) -> Size {
    let fit = (viewport.width - horizontal_margin(viewport, policy) * 2.0).max(0.0);
    let width = policy
        .tooltip_width
        .min(viewport.width * policy.max_width_ratio)
        .min(fit)
        .max(0.0);
    Size::new(width, policy.tooltip_height)
}

pub fn compute_placement(
    target: Option<Rect>,
    preferred: Side,
    viewport: &Viewport,
    policy: &PlacementPolicy,
) -> Placement {
    let size = tooltip_size(viewport, policy);

    let (side, tooltip) = match target {
        Some(rect) if preferred != Side::Center => {
            let side = if in_nav_rail(&rect, policy) {
                trace!(?preferred, "target inside navigation rail, forcing right");
                Side::Right
            } else {
                preferred
            };
            attach(&rect, side, size, viewport, policy)
        }
        _ => (Side::Center, centered(size, viewport, policy)),
    };

    Placement {
        highlight: target.map(|rect| {
            rect.expand(policy.highlight_padding)
                .translate(viewport.scroll_x, viewport.scroll_y)
        }),
        tooltip: tooltip.translate(viewport.scroll_x, viewport.scroll_y),
        side,
    }
}

/// Margin kept on the left and right, never more than half the viewport.
pub fn horizontal_margin(viewport: &Viewport, policy: &PlacementPolicy) -> f64 {
    policy.viewport_margin.min(viewport.width.max(0.0) / 2.0)
}

fn in_nav_rail(target: &Rect, policy: &PlacementPolicy) -> bool {
    policy.nav_rail_width > 0.0 && target.left >= 0.0 && target.right() <= policy.nav_rail_width
}

fn centered(size: Size, viewport: &Viewport, policy: &PlacementPolicy) -> Rect {
    let margin = horizontal_margin(viewport, policy);
    let left = clamp_axis((viewport.width - size.width) / 2.0, size.width, viewport.width, margin);
    let top = clamp_axis(
        (viewport.height - size.height) / 2.0,
        size.height,
        viewport.height,
        policy.viewport_margin,
    );
    Rect::new(left, top, size.width, size.height)
}

fn attach(
    target: &Rect,
    side: Side,
    size: Size,
    viewport: &Viewport,
    policy: &PlacementPolicy,
) -> (Side, Rect) {
    let gap = policy.gap;
    let margin = policy.viewport_margin;
    let above = target.top - size.height - gap;
    let below = target.bottom() + gap;

    let (left, top) = match side {
        Side::Top => (target.center_x() - size.width / 2.0, above),
        Side::Bottom => (target.center_x() - size.width / 2.0, below),
        Side::Left => (
            target.left - size.width - gap,
            target.center_y() - size.height / 2.0,
        ),
        Side::Right => (target.right() + gap, target.center_y() - size.height / 2.0),
        Side::Center => return (Side::Center, centered(size, viewport, policy)),
    };

    let left = clamp_axis(
        left,
        size.width,
        viewport.width,
        horizontal_margin(viewport, policy),
    );

    let (side, top) = match side {
        Side::Top if top < 0.0 => (Side::Bottom, below),
        Side::Bottom if top + size.height > viewport.height => (Side::Top, above),
        other => (other, top),
    };
    let top = clamp_axis(top, size.height, viewport.height, margin);

    (side, Rect::new(left, top, size.width, size.height))
}

/// Clamps `pos` into `[margin, extent - len - margin]`, pinning to `margin`
/// when the box cannot fit.
fn clamp_axis(pos: f64, len: f64, extent: f64, margin: f64) -> f64 {
    let max = (extent - len - margin).max(margin);
    pos.clamp(margin, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PlacementPolicy {
        PlacementPolicy::default()
    }

    fn place(target: Rect, side: Side) -> Placement {
        compute_placement(Some(target), side, &Viewport::new(800.0, 600.0), &policy())
    }

    #[test]
    fn top_near_viewport_edge_flips_to_bottom() {
        let placement = place(Rect::new(300.0, 10.0, 100.0, 30.0), Side::Top);
        assert_eq!(placement.side, Side::Bottom);
        assert_eq!(placement.tooltip, Rect::new(158.0, 60.0, 384.0, 400.0));
        assert_eq!(placement.highlight, Some(Rect::new(296.0, 6.0, 108.0, 38.0)));
    }

    #[test]
    fn bottom_overflow_flips_to_top() {
        let placement = place(Rect::new(300.0, 500.0, 100.0, 30.0), Side::Bottom);
        assert_eq!(placement.side, Side::Top);
        assert_eq!(placement.tooltip.top, 80.0);
    }

    #[test]
    fn left_side_is_vertically_centred() {
        let placement = place(Rect::new(500.0, 250.0, 100.0, 40.0), Side::Left);
        assert_eq!(placement.side, Side::Left);
        assert_eq!(placement.tooltip, Rect::new(96.0, 70.0, 384.0, 400.0));
    }

    #[test]
    fn right_side_overflow_is_clamped_not_flipped() {
        let placement = place(Rect::new(600.0, 100.0, 100.0, 40.0), Side::Right);
        assert_eq!(placement.side, Side::Right);
        assert_eq!(placement.tooltip.left, 396.0);
        assert_eq!(placement.tooltip.top, 20.0);
    }

    #[test]
    fn navigation_rail_forces_right() {
        let placement = place(Rect::new(10.0, 200.0, 50.0, 40.0), Side::Top);
        assert_eq!(placement.side, Side::Right);
        assert_eq!(placement.tooltip.left, 80.0);
        assert_eq!(placement.tooltip.top, 20.0);

        let mut no_rail = policy();
        no_rail.nav_rail_width = 0.0;
        let placement = compute_placement(
            Some(Rect::new(10.0, 500.0, 50.0, 40.0)),
            Side::Top,
            &Viewport::new(800.0, 600.0),
            &no_rail,
        );
        assert_eq!(placement.side, Side::Top);
    }

    #[test]
    fn center_and_missing_target() {
        let viewport = Viewport::new(800.0, 600.0);
        let body = compute_placement(None, Side::Bottom, &viewport, &policy());
        assert_eq!(body.side, Side::Center);
        assert_eq!(body.highlight, None);
        assert_eq!(body.tooltip, Rect::new(208.0, 100.0, 384.0, 400.0));

        let target = Rect::new(300.0, 10.0, 100.0, 30.0);
        let centered = compute_placement(Some(target), Side::Center, &viewport, &policy());
        assert_eq!(centered.tooltip, body.tooltip);
        assert_eq!(centered.highlight, Some(target.expand(4.0)));
    }

    #[test]
    fn scroll_offset_moves_results_into_document_space() {
        let viewport = Viewport::new(800.0, 600.0).with_scroll(0.0, 1000.0);
        let placement = compute_placement(
            Some(Rect::new(300.0, 300.0, 100.0, 30.0)),
            Side::Right,
            &viewport,
            &policy(),
        );
        assert_eq!(placement.tooltip, Rect::new(396.0, 1115.0, 384.0, 400.0));
        assert_eq!(placement.highlight, Some(Rect::new(296.0, 1296.0, 108.0, 38.0)));
    }

    #[test]
    fn narrow_viewport_caps_width() {
        let viewport = Viewport::new(300.0, 200.0);
        let size = tooltip_size(&viewport, &policy());
        assert_eq!(size.width, 260.0);
        let placement = compute_placement(
            Some(Rect::new(100.0, 50.0, 40.0, 20.0)),
            Side::Bottom,
            &viewport,
            &policy(),
        );
        assert_eq!(placement.tooltip.left, 20.0);
        assert_eq!(placement.tooltip.top, 20.0);
    }

    #[test]
    fn viewport_narrower_than_two_margins_keeps_the_tooltip_inside() {
        let viewport = Viewport::new(30.0, 600.0);
        let policy = policy();
        assert_eq!(horizontal_margin(&viewport, &policy), 15.0);
        assert_eq!(tooltip_size(&viewport, &policy).width, 0.0);
        for side in [Side::Top, Side::Bottom, Side::Left, Side::Right, Side::Center] {
            let tooltip = compute_placement(
                Some(Rect::new(5.0, 200.0, 20.0, 20.0)),
                side,
                &viewport,
                &policy,
            )
            .tooltip;
            assert_eq!(tooltip.left, 15.0, "{side}");
            assert!(tooltip.right() <= viewport.width - 15.0, "{side}");
        }
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let calculator = PlacementCalculator::new(policy());
        let viewport = Viewport::new(1024.0, 768.0);
        let target = Some(Rect::new(412.5, 333.3, 77.0, 21.0));
        let first = calculator.compute(target, Side::Left, &viewport);
        for _ in 0..10 {
            assert_eq!(calculator.compute(target, Side::Left, &viewport), first);
        }
    }

    #[test]
    fn tooltip_stays_inside_horizontal_margins() {
        let policy = policy();
        let sides = [Side::Top, Side::Bottom, Side::Left, Side::Right, Side::Center];
        for width in [320.0, 480.0, 800.0, 1440.0] {
            let viewport = Viewport::new(width, 700.0);
            for left in [-50.0, 0.0, 5.0, 100.0, width / 2.0, width - 40.0, width + 30.0] {
                for top in [-20.0, 0.0, 300.0, 690.0] {
                    let target = Rect::new(left, top, 60.0, 24.0);
                    for side in sides {
                        let tooltip = compute_placement(Some(target), side, &viewport, &policy).tooltip;
                        assert!(tooltip.left >= policy.viewport_margin, "{target:?} {side}");
                        assert!(
                            tooltip.right() <= width - policy.viewport_margin + 1e-9,
                            "{target:?} {side} in {width}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn placement_serializes_side_lowercase() {
        let json = serde_json::to_value(place(Rect::new(300.0, 10.0, 100.0, 30.0), Side::Top)).unwrap();
        assert_eq!(json["side"], "bottom");
    }
}
