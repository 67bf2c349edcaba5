//! Screen and window geometry shared by the accessibility, display, and
//! centring layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Two-dimensional point used for window positioning
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Extent in display points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle. The origin is the corner closest to the origin of
/// whichever coordinate space the rectangle was read from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn mid_x(&self) -> f64 {
        self.origin.x + self.size.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.origin.y + self.size.height / 2.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    /// Same rectangle with its origin moved
    pub fn with_origin(&self, origin: Point) -> Self {
        Self {
            origin,
            size: self.size,
        }
    }

    /// Mirror the rectangle vertically inside a space of the given height.
    ///
    /// AppKit measures from the bottom-left corner of the primary screen while
    /// the accessibility API measures from its top-left corner; flipping with
    /// the primary screen height converts between the two in either direction.
    pub fn flip_y(&self, space_height: f64) -> Self {
        Self::new(
            self.origin.x,
            space_height - self.max_y(),
            self.size.width,
            self.size.height,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{x: {}, y: {}, w: {}, h: {}}}",
            self.origin.x, self.origin.y, self.size.width, self.size.height
        )
    }
}

/// A single screen axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Set of axes a centring operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Axes {
    horizontal: bool,
    vertical: bool,
}

impl Axes {
    pub const NONE: Axes = Axes {
        horizontal: false,
        vertical: false,
    };
    pub const HORIZONTAL: Axes = Axes {
        horizontal: true,
        vertical: false,
    };
    pub const VERTICAL: Axes = Axes {
        horizontal: false,
        vertical: true,
    };
    pub const BOTH: Axes = Axes {
        horizontal: true,
        vertical: true,
    };

    pub fn contains(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.horizontal,
            Axis::Vertical => self.vertical,
        }
    }

    pub fn insert(&mut self, axis: Axis) {
        match axis {
            Axis::Horizontal => self.horizontal = true,
            Axis::Vertical => self.vertical = true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.horizontal && !self.vertical
    }
}

impl From<Axis> for Axes {
    fn from(axis: Axis) -> Self {
        let mut axes = Axes::NONE;
        axes.insert(axis);
        axes
    }
}

impl BitOr for Axes {
    type Output = Axes;

    fn bitor(self, rhs: Axes) -> Axes {
        Axes {
            horizontal: self.horizontal || rhs.horizontal,
            vertical: self.vertical || rhs.vertical,
        }
    }
}

impl FromIterator<Axis> for Axes {
    fn from_iter<I: IntoIterator<Item = Axis>>(iter: I) -> Self {
        let mut axes = Axes::NONE;
        for axis in iter {
            axes.insert(axis);
        }
        axes
    }
}

impl fmt::Display for Axes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match (self.horizontal, self.vertical) {
            (true, true) => "both",
            (true, false) => "horizontal",
            (false, true) => "vertical",
            (false, false) => "none",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_midpoints() {
        let rect = Rect::new(100.0, 50.0, 800.0, 600.0);
        assert_eq!(rect.mid_x(), 500.0);
        assert_eq!(rect.mid_y(), 350.0);
        assert_eq!(rect.max_x(), 900.0);
        assert!(rect.contains(Point::new(500.0, 350.0)));
        assert!(!rect.contains(Point::new(50.0, 350.0)));
    }

    #[test]
    fn flip_converts_bottom_left_to_top_left() {
        // Visible frame of a 1920x1080 screen with a 25pt menu bar and a 70pt dock
        let cocoa = Rect::new(0.0, 70.0, 1920.0, 985.0);
        let flipped = cocoa.flip_y(1080.0);
        assert_eq!(flipped.min_y(), 25.0);
        assert_eq!(flipped.size, cocoa.size);
        assert_eq!(flipped.flip_y(1080.0), cocoa);
    }

    #[test]
    fn axes_set_operations() {
        assert!(Axes::BOTH.contains(Axis::Horizontal));
        assert!(Axes::BOTH.contains(Axis::Vertical));
        assert!(!Axes::HORIZONTAL.contains(Axis::Vertical));
        assert_eq!(Axes::HORIZONTAL | Axes::VERTICAL, Axes::BOTH);
        assert!(Axes::NONE.is_empty());

        let collected: Axes = [Axis::Vertical].into_iter().collect();
        assert_eq!(collected, Axes::VERTICAL);
        assert_eq!(Axes::from(Axis::Horizontal).to_string(), "horizontal");
    }
}
