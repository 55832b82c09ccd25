//! Pixel-space primitives shared by the document model and the window engine.

use std::fmt;

/// A pointer position in page pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Signed origin with unsigned size, in pixels.
///
/// Windows may be dragged partially outside their container, so the origin
/// is allowed to go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Portion of `self` that lies inside `bounds`. Empty when they do not overlap.
    pub fn clipped_to(&self, bounds: Geometry) -> Geometry {
        let left = self.x.max(bounds.x);
        let top = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());
        if right <= left || bottom <= top {
            return Geometry::new(left, top, 0, 0);
        }
        Geometry::new(left, top, (right - left) as u32, (bottom - top) as u32)
    }

    pub fn intersection_area(&self, other: &Geometry) -> u64 {
        let clipped = self.clipped_to(*other);
        clipped.width as u64 * clipped.height as u64
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipped_to_handles_negative_origin() {
        let bounds = Geometry::new(0, 0, 800, 600);
        let rect = Geometry::new(-50, 20, 200, 100);
        let visible = rect.clipped_to(bounds);
        assert_eq!(visible, Geometry::new(0, 20, 150, 100));
    }

    #[test]
    fn clipped_to_disjoint_is_empty() {
        let bounds = Geometry::new(0, 0, 100, 100);
        let rect = Geometry::new(200, 200, 10, 10);
        assert!(rect.clipped_to(bounds).is_empty());
        assert_eq!(rect.intersection_area(&bounds), 0);
    }

    #[test]
    fn contains_is_half_open() {
        let rect = Geometry::new(10, 10, 5, 5);
        assert!(rect.contains(Point::new(10, 10)));
        assert!(rect.contains(Point::new(14, 14)));
        assert!(!rect.contains(Point::new(15, 10)));
        assert!(!rect.contains(Point::new(9, 12)));
    }
}
