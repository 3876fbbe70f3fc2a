//! Geometry primitives and screen/logical space conversion.
//!
//! Screen space is measured in pixels with the origin at the top-left of the
//! view. Logical space is the unbounded drawing plane elements live on.

pub use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Scale + translation mapping logical coordinates to screen pixels.
///
/// `screen = logical * scale + translation`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub translation: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translation: Vec2::ZERO,
    };

    pub fn new(scale: f64, translation: Vec2) -> Self {
        Self { scale, translation }
    }

    /// Affine for rendering (logical -> screen).
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.translation) * Affine::scale(self.scale)
    }

    /// Affine for input handling (screen -> logical).
    pub fn inverse_affine(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.translation)
    }

    pub fn screen_to_logical(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.translation.x) / self.scale,
            (screen.y - self.translation.y) / self.scale,
        )
    }

    pub fn logical_to_screen(&self, logical: Point) -> Point {
        Point::new(
            logical.x * self.scale + self.translation.x,
            logical.y * self.scale + self.translation.y,
        )
    }

    /// Convert a screen-space distance to a logical distance.
    pub fn screen_dist_to_logical(&self, dist: f64) -> f64 {
        dist / self.scale
    }

    /// Map a screen rectangle into logical space.
    pub fn screen_rect_to_logical(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.screen_to_logical(Point::new(rect.x0, rect.y0)),
            self.screen_to_logical(Point::new(rect.x1, rect.y1)),
        )
    }
}

/// Rotate a vector by an angle given in degrees (clockwise on a y-down screen).
pub fn rotate_vec(v: Vec2, degrees: f64) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees % 360.0;
    if d < 0.0 { d + 360.0 } else { d }
}
