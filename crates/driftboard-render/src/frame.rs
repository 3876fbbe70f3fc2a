//! Frame assembly: everything a backend needs to draw one frame, already in
//! screen space.

use crate::renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
use driftboard_core::assets::{AssetState, RasterImage};
use driftboard_core::grid::{Axis, GridLine, compute_grid};
use driftboard_core::selection::{HandleKind, handles};
use driftboard_core::{Element, ElementId, ElementKind};
use kurbo::{Affine, Line, Point, Rect, Size, Vec2};
use peniko::Color;

/// A grid mark in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridMark {
    Line(Line),
    Dot(Point),
}

/// What to draw inside an element's box.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintContent {
    Raster(RasterImage),
    /// Image not loaded yet, or failed.
    Placeholder,
    Text(String),
}

/// An element ready to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintItem {
    pub id: ElementId,
    /// Maps the element's local box `(0, 0)..(width, height)` to the screen.
    pub transform: Affine,
    pub size: Size,
    pub content: PaintContent,
    pub color: Color,
    pub opacity: f64,
    pub dragging: bool,
}

/// Outline and handles of the selected element, in screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChrome {
    pub id: ElementId,
    pub outline: [Point; 4],
    pub handles: Vec<(HandleKind, Point)>,
    pub color: Color,
    pub free_resize: bool,
}

/// A fully assembled frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub background: Color,
    /// Logical to screen.
    pub transform: Affine,
    pub grid: Vec<GridMark>,
    /// Back to front.
    pub items: Vec<PaintItem>,
    pub selection: Option<SelectionChrome>,
    /// Elements skipped because they were off screen.
    pub culled: usize,
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

fn element_transform(view: Affine, element: &Element) -> Affine {
    let half = Vec2::new(element.size.width / 2.0, element.size.height / 2.0);
    view * Affine::translate(element.center().to_vec2())
        * Affine::rotate(element.rotation.to_radians())
        * Affine::translate(-half)
}

fn grid_marks(ctx: &RenderContext, view: Affine) -> Vec<GridMark> {
    if ctx.grid_style == GridStyle::None {
        return Vec::new();
    }
    let session = ctx.session;
    let lines = compute_grid(
        &session.viewport().view_transform(),
        &session.config().grid,
        ctx.viewport_size,
    );
    match ctx.grid_style {
        GridStyle::None => Vec::new(),
        GridStyle::Lines => lines
            .iter()
            .map(|l| {
                let segment = l.segment();
                GridMark::Line(Line::new(view * segment.p0, view * segment.p1))
            })
            .collect(),
        GridStyle::Dots => {
            let (columns, rows): (Vec<&GridLine>, Vec<&GridLine>) =
                lines.iter().partition(|l| l.axis == Axis::Vertical);
            columns
                .iter()
                .flat_map(|c| rows.iter().map(move |r| GridMark::Dot(view * Point::new(c.offset, r.offset))))
                .collect()
        }
    }
}

fn paint_content(ctx: &RenderContext, element: &Element) -> PaintContent {
    match element.kind {
        ElementKind::Image => match ctx.session.assets().get(&element.id) {
            Some(AssetState::Loaded(raster)) => PaintContent::Raster(raster.clone()),
            _ => PaintContent::Placeholder,
        },
        ElementKind::Text => PaintContent::Text(element.content.clone().unwrap_or_default()),
    }
}

/// Assemble the frame for the session's current state.
pub fn build_frame(ctx: &RenderContext) -> RenderResult<Frame> {
    let size = ctx.viewport_size;
    if !(size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0) {
        return Err(RendererError::RenderFailed(format!(
            "invalid viewport size {}x{}",
            size.width, size.height
        )));
    }

    let session = ctx.session;
    let view = session.viewport().transform();
    let visible = session.viewport().visible_logical_bounds(size.width, size.height);
    let selection = session.selection();

    let mut items = Vec::new();
    let mut culled = 0;
    let mut chrome = None;

    for element in session.display_elements() {
        if selection.is_selected(&element.id) {
            chrome = Some(SelectionChrome {
                id: element.id.clone(),
                outline: element.corners().map(|p| view * p),
                handles: handles(&element)
                    .into_iter()
                    .map(|h| (h.kind, view * h.position))
                    .collect(),
                color: ctx.selection_color,
                free_resize: selection.free_resize(),
            });
        }
        if !overlaps(element.bounds(), visible) {
            culled += 1;
            continue;
        }
        items.push(PaintItem {
            transform: element_transform(view, &element),
            size: element.size,
            content: paint_content(ctx, &element),
            color: element.style.color.into(),
            opacity: element.style.opacity,
            dragging: element.is_dragging,
            id: element.id,
        });
    }

    Ok(Frame {
        background: ctx.background_color,
        transform: view,
        grid: grid_marks(ctx, view),
        items,
        selection: chrome,
        culled,
    })
}

/// Headless renderer that keeps the last assembled frame.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    last: Option<Frame>,
    frames_built: u64,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    pub fn frames_built(&self) -> u64 {
        self.frames_built
    }
}

impl Renderer for FrameRecorder {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let frame = build_frame(ctx)?;
        self.frames_built += 1;
        self.last = Some(frame);
        Ok(())
    }
}
