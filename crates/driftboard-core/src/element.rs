//! Canvas element definitions.

use crate::geometry::{Point, Rect, Size, Vec2, rotate_vec};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique element identifier. Generated by the caller at insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque key of a stored binary asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of element content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Image,
    Text,
}

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
                255,
            )),
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Visual style of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementStyle {
    /// Text color, or border color for images.
    pub color: SerializableColor,
    pub background: Option<SerializableColor>,
    pub font_size: f64,
    pub opacity: f64,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            background: None,
            font_size: 16.0,
            opacity: 1.0,
        }
    }
}

/// A positioned element on the canvas.
///
/// `position` is the top-left corner of the unrotated box. Rotation is in
/// degrees, clockwise, about the box center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub position: Point,
    pub size: Size,
    pub rotation: f64,
    #[serde(default)]
    pub style: ElementStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<AssetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Visual-only flag while a drag gesture is in progress.
    #[serde(skip)]
    pub is_dragging: bool,
}

impl Element {
    /// Create an image element backed by a stored asset.
    pub fn image(id: ElementId, asset: AssetRef, position: Point, size: Size) -> Self {
        Self {
            id,
            kind: ElementKind::Image,
            position,
            size,
            rotation: 0.0,
            style: ElementStyle::default(),
            image_ref: Some(asset),
            content: None,
            is_dragging: false,
        }
    }

    /// Create a text element.
    pub fn text(id: ElementId, content: impl Into<String>, position: Point, size: Size) -> Self {
        Self {
            id,
            kind: ElementKind::Text,
            position,
            size,
            rotation: 0.0,
            style: ElementStyle::default(),
            image_ref: None,
            content: Some(content.into()),
            is_dragging: false,
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    /// Whether the element should be fed to the asset loader.
    pub fn needs_asset(&self) -> bool {
        self.kind == ElementKind::Image && self.image_ref.is_some()
    }

    /// The unrotated box.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Map a point in the element's local frame (origin at the unrotated
    /// top-left, axes along the element's edges) to logical space.
    pub fn local_to_world(&self, local: Point) -> Point {
        let half = Vec2::new(self.size.width / 2.0, self.size.height / 2.0);
        self.center() + rotate_vec(local.to_vec2() - half, self.rotation)
    }

    /// Inverse of [`Element::local_to_world`].
    pub fn world_to_local(&self, world: Point) -> Point {
        let half = Vec2::new(self.size.width / 2.0, self.size.height / 2.0);
        (rotate_vec(world - self.center(), -self.rotation) + half).to_point()
    }

    /// Corners in logical space: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let (w, h) = (self.size.width, self.size.height);
        [
            self.local_to_world(Point::new(0.0, 0.0)),
            self.local_to_world(Point::new(w, 0.0)),
            self.local_to_world(Point::new(w, h)),
            self.local_to_world(Point::new(0.0, h)),
        ]
    }

    /// Axis-aligned bounds of the rotated box.
    pub fn bounds(&self) -> Rect {
        let corners = self.corners();
        corners[1..]
            .iter()
            .fold(Rect::from_points(corners[0], corners[0]), |r, &p| r.union_pt(p))
    }

    /// Rectangular hit test in the element's rotated frame.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let local = self.world_to_local(point);
        local.x >= -tolerance
            && local.y >= -tolerance
            && local.x <= self.size.width + tolerance
            && local.y <= self.size.height + tolerance
    }
}
