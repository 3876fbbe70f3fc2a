//! Driftboard Render Library
//!
//! Turns a board session into screen-space frames behind a renderer trait.

mod frame;
mod renderer;

pub use frame::{Frame, FrameRecorder, GridMark, PaintContent, PaintItem, SelectionChrome, build_frame};
pub use renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
