//! Background grid derived from the viewport.
//!
//! The grid is recomputed from scratch for every frame; nothing is cached
//! between calls.

use crate::config::GridConfig;
use crate::geometry::{Point, Rect, Size, ViewTransform};
use kurbo::Line;
use serde::{Deserialize, Serialize};

/// Orientation of a grid line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Constant y, spans along x.
    Horizontal,
    /// Constant x, spans along y.
    Vertical,
}

/// A single grid line in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub axis: Axis,
    /// x for vertical lines, y for horizontal lines.
    pub offset: f64,
    /// Where the span begins along the other axis.
    pub start: f64,
    pub length: f64,
}

impl GridLine {
    /// The line as a logical-space segment.
    pub fn segment(&self) -> Line {
        match self.axis {
            Axis::Vertical => Line::new(
                Point::new(self.offset, self.start),
                Point::new(self.offset, self.start + self.length),
            ),
            Axis::Horizontal => Line::new(
                Point::new(self.start, self.offset),
                Point::new(self.start + self.length, self.offset),
            ),
        }
    }
}

/// Hard cap on lines per axis, reached only with a degenerate config.
const MAX_LINES_PER_AXIS: usize = 4096;

/// The step actually used at the current scale.
///
/// The configured step is doubled until adjacent lines sit at least
/// `min_screen_spacing` pixels apart.
pub fn effective_step(config: &GridConfig, scale: f64) -> f64 {
    let mut step = config.step;
    if !(step > 0.0 && scale > 0.0) {
        return step;
    }
    while step * scale < config.min_screen_spacing {
        step *= 2.0;
    }
    step
}

/// Logical bounds covered by the grid, snapped outward to whole steps with one
/// extra cell of margin on every side.
pub fn grid_bounds(view: &ViewTransform, step: f64, viewport_size: Size) -> Rect {
    let visible =
        view.screen_rect_to_logical(Rect::new(0.0, 0.0, viewport_size.width, viewport_size.height));
    let start_x = (visible.x0 / step).floor() * step - step;
    let start_y = (visible.y0 / step).floor() * step - step;
    let end_x = (visible.x1 / step).ceil() * step + step;
    let end_y = (visible.y1 / step).ceil() * step + step;
    Rect::new(start_x, start_y, end_x, end_y)
}

/// Compute the grid lines visible through the viewport.
///
/// Line offsets are whole multiples of the step, so lines stay put in
/// logical space while panning.
pub fn compute_grid(view: &ViewTransform, config: &GridConfig, viewport_size: Size) -> Vec<GridLine> {
    if !(config.step > 0.0 && view.scale > 0.0)
        || viewport_size.width <= 0.0
        || viewport_size.height <= 0.0
    {
        return Vec::new();
    }

    let step = effective_step(config, view.scale);
    let bounds = grid_bounds(view, step, viewport_size);

    let columns = ((bounds.width() / step).round() as usize + 1).min(MAX_LINES_PER_AXIS);
    let rows = ((bounds.height() / step).round() as usize + 1).min(MAX_LINES_PER_AXIS);
    let first_column = (bounds.x0 / step).round();
    let first_row = (bounds.y0 / step).round();

    let mut lines = Vec::with_capacity(columns + rows);

    // Offsets come from integer indices rather than accumulation to avoid drift
    lines.extend((0..columns).map(|i| GridLine {
        axis: Axis::Vertical,
        offset: (first_column + i as f64) * step,
        start: bounds.y0,
        length: bounds.height(),
    }));
    lines.extend((0..rows).map(|i| GridLine {
        axis: Axis::Horizontal,
        offset: (first_row + i as f64) * step,
        start: bounds.x0,
        length: bounds.width(),
    }));

    lines
}
