//! Viewport module for pan/zoom transforms.

use crate::config::ViewportConfig;
use crate::geometry::{Affine, Point, Rect, Size, Vec2, ViewTransform};
use serde::{Deserialize, Serialize};

/// Direction of a single zoom notch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Map a wheel delta to a direction (scrolling up zooms in).
    /// A zero delta carries no direction.
    pub fn from_wheel_delta(delta_y: f64) -> Option<Self> {
        if delta_y < 0.0 {
            Some(Self::In)
        } else if delta_y > 0.0 {
            Some(Self::Out)
        } else {
            None
        }
    }
}

/// Viewport manages the view transform for the canvas.
///
/// It owns the current scale and translation, keeps the scale within its
/// configured bounds, and converts between screen and logical coordinates.
/// The persisted view lives in `CanvasRecord`; a viewport is only restored
/// through `set_from_persisted`, which clamps.
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Current scale factor (1.0 = 100%).
    scale: f64,
    /// Current translation offset in screen pixels.
    translation: Vec2,
    /// Zoom limits and step.
    config: ViewportConfig,
    /// Set once persisted state has been applied.
    persisted_applied: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    /// Create an identity viewport with the given limits.
    /// Invalid limits are replaced by the defaults.
    pub fn new(config: ViewportConfig) -> Self {
        let config = config.or_default();
        Self {
            scale: 1.0_f64.clamp(config.min_scale, config.max_scale),
            translation: Vec2::ZERO,
            config,
            persisted_applied: false,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Current scale and translation as a value.
    pub fn view_transform(&self) -> ViewTransform {
        ViewTransform::new(self.scale, self.translation)
    }

    /// Get the affine transform for rendering (logical -> screen).
    pub fn transform(&self) -> Affine {
        self.view_transform().to_affine()
    }

    /// Get the inverse transform for input handling (screen -> logical).
    pub fn inverse_transform(&self) -> Affine {
        self.view_transform().inverse_affine()
    }

    pub fn screen_to_logical(&self, screen_point: Point) -> Point {
        self.view_transform().screen_to_logical(screen_point)
    }

    pub fn logical_to_screen(&self, logical_point: Point) -> Point {
        self.view_transform().logical_to_screen(logical_point)
    }

    /// Clamp a candidate scale into bounds. Non-finite values are rejected.
    fn clamp_scale(&self, scale: f64) -> Option<f64> {
        if !scale.is_finite() {
            return None;
        }
        Some(scale.clamp(self.config.min_scale, self.config.max_scale))
    }

    /// Zoom one notch, keeping the logical point under `pointer` fixed on screen.
    ///
    /// Without a pointer position there is no anchor and the zoom is skipped.
    /// Returns whether the view changed.
    pub fn zoom_at(&mut self, pointer: Option<Point>, direction: ZoomDirection) -> bool {
        let Some(pointer) = pointer else {
            log::debug!("zoom skipped: no pointer anchor");
            return false;
        };
        let step = self.config.scale_step;
        let candidate = match direction {
            ZoomDirection::In => self.scale * step,
            ZoomDirection::Out => self.scale / step,
        };
        let Some(new_scale) = self.clamp_scale(candidate) else {
            return false;
        };
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return false;
        }

        // Logical point under the pointer before rescaling
        let logical = self.screen_to_logical(pointer);

        self.scale = new_scale;
        self.translation = Vec2::new(
            pointer.x - logical.x * new_scale,
            pointer.y - logical.y * new_scale,
        );
        true
    }

    /// Pan the viewport by a delta in screen coordinates.
    pub fn pan_by(&mut self, delta: Vec2) {
        if delta.x.is_finite() && delta.y.is_finite() {
            self.translation += delta;
        }
    }

    /// Reset to identity scale and zero translation.
    pub fn reset(&mut self) {
        self.scale = 1.0_f64.clamp(self.config.min_scale, self.config.max_scale);
        self.translation = Vec2::ZERO;
    }

    /// Apply persisted view state. Only the first call has any effect so that
    /// later external updates never overwrite live interaction.
    pub fn set_from_persisted(&mut self, scale: f64, translation: Vec2) -> bool {
        if self.persisted_applied {
            return false;
        }
        self.persisted_applied = true;
        let Some(scale) = self.clamp_scale(scale) else {
            log::warn!("ignoring persisted viewport with non-finite scale");
            return false;
        };
        self.scale = scale;
        if translation.x.is_finite() && translation.y.is_finite() {
            self.translation = translation;
        }
        true
    }

    /// Whether persisted state has already been applied.
    pub fn has_persisted_state(&self) -> bool {
        self.persisted_applied
    }

    /// The logical-space rectangle visible in a viewport of the given size.
    pub fn visible_logical_bounds(&self, width_px: f64, height_px: f64) -> Rect {
        self.view_transform()
            .screen_rect_to_logical(Rect::new(0.0, 0.0, width_px, height_px))
    }

    /// Fit the viewport to show the given logical bounding box.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let padded_viewport = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded_viewport.width / bounds.width();
        let scale_y = padded_viewport.height / bounds.height();
        let Some(scale) = self.clamp_scale(scale_x.min(scale_y)) else {
            return;
        };
        self.scale = scale;

        // Center the bounds in the viewport
        let bounds_center = bounds.center();
        self.translation = Vec2::new(
            viewport.width / 2.0 - bounds_center.x * self.scale,
            viewport.height / 2.0 - bounds_center.y * self.scale,
        );
    }
}
