use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tooltip_placement::{tooltip_size, PlacementCalculator};
use tourguide_core_types::{Rect, Side, Size, Viewport};

use super::context::CliContext;
use super::output::print_structured;

#[derive(Args, Clone, Debug)]
pub struct PlaceArgs {
    /// Target rect in viewport coordinates as `left,top,width,height`;
    /// omit for a whole-viewport step
    #[arg(short, long, value_name = "RECT")]
    pub target: Option<String>,

    /// Preferred side
    #[arg(short, long, default_value = "bottom")]
    pub side: String,

    /// Viewport size as `WIDTHxHEIGHT`
    #[arg(long, default_value = "1280x800")]
    pub viewport: String,

    /// Scroll offset as `X,Y`
    #[arg(long, value_name = "X,Y")]
    pub scroll: Option<String>,
}

#[derive(Serialize)]
struct PlaceReport {
    viewport: Viewport,
    preferred: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<Rect>,
    size: Size,
    side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    highlight: Option<Rect>,
    tooltip: Rect,
}

pub fn cmd_place(args: PlaceArgs, ctx: &CliContext) -> Result<()> {
    let preferred: Side = args.side.parse().context("Invalid --side")?;
    let mut viewport: Viewport = args.viewport.parse().context("Invalid --viewport")?;
    if let Some(raw) = args.scroll.as_deref() {
        let (x, y) = parse_pair(raw).with_context(|| format!("Invalid --scroll '{raw}'"))?;
        viewport = viewport.with_scroll(x, y);
    }
    let target = args
        .target
        .as_deref()
        .map(str::parse::<Rect>)
        .transpose()
        .context("Invalid --target")?;

    let calculator = PlacementCalculator::new(ctx.policy().placement.clone());
    let placement = calculator.compute(target, preferred, &viewport);
    let report = PlaceReport {
        viewport,
        preferred,
        target,
        size: tooltip_size(&viewport, calculator.policy()),
        side: placement.side,
        highlight: placement.highlight,
        tooltip: placement.tooltip,
    };

    if print_structured(ctx.output(), &report)? {
        return Ok(());
    }
    println!("side      {} (preferred {})", report.side, report.preferred);
    println!("tooltip   {}", format_rect(&report.tooltip));
    match report.highlight {
        Some(rect) => println!("highlight {}", format_rect(&rect)),
        None => println!("highlight none"),
    }
    Ok(())
}

fn parse_pair(raw: &str) -> Result<(f64, f64)> {
    let (x, y) = raw.split_once(',').context("expected X,Y")?;
    Ok((x.trim().parse()?, y.trim().parse()?))
}

fn format_rect(rect: &Rect) -> String {
    format!(
        "left={} top={} width={} height={}",
        rect.left, rect.top, rect.width, rect.height
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_pairs() {
        assert_eq!(parse_pair("0, 400").unwrap(), (0.0, 400.0));
        assert!(parse_pair("400").is_err());
        assert!(parse_pair("a,b").is_err());
    }
}
