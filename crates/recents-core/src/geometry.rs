#![forbid(unsafe_code)]

//! Float geometry for window surfaces and carousel slots.
//!
//! Coordinates are device pixels with the origin at the top-left of the
//! display. Rectangles are half-open: `right()` and `bottom()` are exclusive.

/// A point in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Same as `x`.
    pub x: f32,
    /// Same as `y`.
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Rectangle from origin and size.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle at the origin with the given size.
    #[inline]
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Create a rectangle from its four edges.
    #[inline]
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    #[inline]
    pub const fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub const fn top(&self) -> f32 {
        self.y
    }

    /// `x + width`.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// `y + height`.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.center_x(), self.center_y())
    }

    /// True when either dimension is zero or negative.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Shrink by the given insets. Dimensions never go negative.
    pub fn inset(&self, insets: Insets) -> Rect {
        let x = self.x + insets.left;
        let y = self.y + insets.top;
        let width = (self.width - insets.horizontal_sum()).max(0.0);
        let height = (self.height - insets.vertical_sum()).max(0.0);
        Rect::new(x, y, width, height)
    }

    /// Translate by `(dx, dy)`.
    #[inline]
    pub fn offset(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Scale about a pivot point.
    pub fn scale_about(&self, scale: f32, pivot: Point) -> Rect {
        Rect::from_ltrb(
            pivot.x + (self.left() - pivot.x) * scale,
            pivot.y + (self.top() - pivot.y) * scale,
            pivot.x + (self.right() - pivot.x) * scale,
            pivot.y + (self.bottom() - pivot.y) * scale,
        )
    }

    /// Edge-wise linear interpolation between two rectangles.
    pub fn lerp(&self, other: &Rect, t: f32) -> Rect {
        Rect::from_ltrb(
            lerp(self.left(), other.left(), t),
            lerp(self.top(), other.top(), t),
            lerp(self.right(), other.right(), t),
            lerp(self.bottom(), other.bottom(), t),
        )
    }

    /// Approximate equality within `eps` on every edge.
    pub fn approx_eq(&self, other: &Rect, eps: f32) -> bool {
        (self.left() - other.left()).abs() <= eps
            && (self.top() - other.top()).abs() <= eps
            && (self.right() - other.right()).abs() <= eps
            && (self.bottom() - other.bottom()).abs() <= eps
    }
}

/// Insets (system bars, cutouts) applied to a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Insets {
    pub const ZERO: Insets = Insets::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Total horizontal inset.
    #[inline]
    pub fn horizontal_sum(&self) -> f32 {
        self.left + self.right
    }

    /// Total vertical inset.
    #[inline]
    pub fn vertical_sum(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Linear interpolation from `a` to `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_and_center() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.bottom(), 70.0);
        assert_eq!(r.center(), Point::new(60.0, 45.0));
    }

    #[test]
    fn from_ltrb_matches_new() {
        assert_eq!(
            Rect::from_ltrb(1.0, 2.0, 11.0, 22.0),
            Rect::new(1.0, 2.0, 10.0, 20.0)
        );
    }

    #[test]
    fn inset_clamps_to_zero() {
        let r = Rect::from_size(10.0, 10.0).inset(Insets::new(8.0, 0.0, 8.0, 0.0));
        assert_eq!(r.width, 0.0);
        assert!(r.is_empty());
    }

    #[test]
    fn scale_about_center_keeps_center() {
        let r = Rect::new(0.0, 0.0, 100.0, 200.0);
        let s = r.scale_about(0.5, r.center());
        assert!(s.approx_eq(&Rect::new(25.0, 50.0, 50.0, 100.0), 1e-4));
    }

    #[test]
    fn lerp_endpoints() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(100.0, 100.0, 50.0, 20.0);
        assert!(a.lerp(&b, 0.0).approx_eq(&a, 1e-5));
        assert!(a.lerp(&b, 1.0).approx_eq(&b, 1e-5));
    }
}
