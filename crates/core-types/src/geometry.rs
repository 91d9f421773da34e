//! Geometry in CSS pixels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Axis-aligned rectangle. `left`/`top` are the origin, extents are non-negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// True when the rect covers no area (nothing laid out).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 && self.height <= 0.0
    }

    /// Grows the rect outward by `pad` on every side.
    pub fn expand(&self, pad: f64) -> Self {
        Self::new(
            self.left - pad,
            self.top - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// Smallest rect containing both.
    pub fn union(&self, other: &Rect) -> Self {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(left, top, right - left, bottom - top)
    }

    /// Bounding box of a list of client rects, `None` when the list is empty.
    pub fn bounding(rects: &[Rect]) -> Option<Rect> {
        let (first, rest) = rects.split_first()?;
        Some(rest.iter().fold(*first, |acc, rect| acc.union(rect)))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Parses `left,top,width,height`.
impl FromStr for Rect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| CoreError::InvalidRect(format!("{s}: {err}")))?;
        match parts.as_slice() {
            [left, top, width, height] if *width >= 0.0 && *height >= 0.0 => {
                Ok(Rect::new(*left, *top, *width, *height))
            }
            [_, _, _, _] => Err(CoreError::InvalidRect(format!(
                "{s}: negative extent"
            ))),
            _ => Err(CoreError::InvalidRect(format!(
                "{s}: expected left,top,width,height"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Visible browser viewport plus the document scroll offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    pub fn with_scroll(mut self, scroll_x: f64, scroll_y: f64) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Parses `WIDTHxHEIGHT`.
impl FromStr for Viewport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| CoreError::InvalidRect(format!("{s}: expected WIDTHxHEIGHT")))?;
        let width = w
            .trim()
            .parse::<f64>()
            .map_err(|err| CoreError::InvalidRect(format!("{s}: {err}")))?;
        let height = h
            .trim()
            .parse::<f64>()
            .map_err(|err| CoreError::InvalidRect(format!("{s}: {err}")))?;
        Ok(Viewport::new(width, height))
    }
}

/// Side of the target the tooltip is attached to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
    Center,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
            Side::Center => "center",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Side::Top),
            "bottom" => Ok(Side::Bottom),
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "center" => Ok(Side::Center),
            other => Err(CoreError::InvalidSide(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_grows_every_edge() {
        let rect = Rect::new(10.0, 20.0, 100.0, 30.0).expand(4.0);
        assert_eq!(rect, Rect::new(6.0, 16.0, 108.0, 38.0));
    }

    #[test]
    fn bounding_of_client_rects() {
        assert_eq!(Rect::bounding(&[]), None);
        let rects = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(20.0, 5.0, 10.0, 20.0)];
        assert_eq!(Rect::bounding(&rects), Some(Rect::new(0.0, 0.0, 30.0, 25.0)));
    }

    #[test]
    fn parse_rect_and_viewport() {
        let rect: Rect = "300, 10, 100, 30".parse().unwrap();
        assert_eq!(rect, Rect::new(300.0, 10.0, 100.0, 30.0));
        assert!("1,2,3".parse::<Rect>().is_err());
        assert!("1,2,-3,4".parse::<Rect>().is_err());

        let viewport: Viewport = "800x600".parse().unwrap();
        assert_eq!(viewport, Viewport::new(800.0, 600.0));
        assert!("800".parse::<Viewport>().is_err());
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("TOP".parse::<Side>().unwrap(), Side::Top);
        assert_eq!(
            "middle".parse::<Side>(),
            Err(CoreError::InvalidSide("middle".into()))
        );
    }
}
