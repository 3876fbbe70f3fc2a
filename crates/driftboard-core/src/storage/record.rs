//! Canvas wire format and its normalization into canonical elements.
//!
//! Stored canvases come from several writers over time, so the raw records
//! tolerate alternate spellings and missing or malformed values. Everything
//! is resolved here, once, so the rest of the crate only sees [`Element`].

use super::{StorageError, StorageResult};
use crate::config::ElementConfig;
use crate::element::{AssetRef, Element, ElementId, ElementKind, ElementStyle};
use crate::geometry::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A canvas as the core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasRecord {
    #[serde(default)]
    pub id: String,
    /// Viewport translation in screen pixels.
    pub position: Point,
    /// Viewport scale.
    pub scale: f64,
    pub elements: Vec<Element>,
}

impl Default for CanvasRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            position: Point::ZERO,
            scale: 1.0,
            elements: Vec::new(),
        }
    }
}

impl CanvasRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn translation(&self) -> Vec2 {
        self.position.to_vec2()
    }

    /// Serialize to the canonical JSON form.
    pub fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Parse any supported wire form with default element sizes.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        Self::from_json_with(json, &ElementConfig::default())
    }

    /// Parse any supported wire form.
    pub fn from_json_with(json: &str, defaults: &ElementConfig) -> StorageResult<Self> {
        let raw: RawCanvas =
            serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(raw.normalize(defaults))
    }
}

/// Loosely typed point as found on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    x: Option<Value>,
    #[serde(default, rename = "X")]
    x_upper: Option<Value>,
    #[serde(default)]
    y: Option<Value>,
    #[serde(default, rename = "Y")]
    y_upper: Option<Value>,
}

impl RawPoint {
    fn resolve(&self) -> (Option<f64>, Option<f64>) {
        (
            first_number([&self.x, &self.x_upper]),
            first_number([&self.y, &self.y_upper]),
        )
    }
}

/// Loosely typed size as found on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSize {
    #[serde(default)]
    width: Option<Value>,
    #[serde(default, rename = "Width")]
    width_upper: Option<Value>,
    #[serde(default)]
    height: Option<Value>,
    #[serde(default, rename = "Height")]
    height_upper: Option<Value>,
}

impl RawSize {
    fn resolve(&self) -> (Option<f64>, Option<f64>) {
        (
            first_number([&self.width, &self.width_upper]),
            first_number([&self.height, &self.height_upper]),
        )
    }
}

/// A canvas as found on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCanvas {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    position: Option<RawPoint>,
    #[serde(default)]
    scale: Option<Value>,
    #[serde(default)]
    zoom: Option<Value>,
    #[serde(default)]
    elements: Vec<RawElement>,
}

/// An element as found on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    position: Option<RawPoint>,
    #[serde(default)]
    size: Option<RawSize>,
    #[serde(default)]
    x: Option<Value>,
    #[serde(default, rename = "X")]
    x_upper: Option<Value>,
    #[serde(default, rename = "posX")]
    pos_x: Option<Value>,
    #[serde(default)]
    y: Option<Value>,
    #[serde(default, rename = "Y")]
    y_upper: Option<Value>,
    #[serde(default, rename = "posY")]
    pos_y: Option<Value>,
    #[serde(default)]
    width: Option<Value>,
    #[serde(default, rename = "Width")]
    width_upper: Option<Value>,
    #[serde(default)]
    height: Option<Value>,
    #[serde(default, rename = "Height")]
    height_upper: Option<Value>,
    #[serde(default)]
    rotation: Option<Value>,
    #[serde(default)]
    image_ref: Option<String>,
    #[serde(default, rename = "imageRef")]
    image_ref_camel: Option<String>,
    #[serde(default, rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    style: Option<Value>,
}

impl RawCanvas {
    /// Resolve into a canonical record.
    pub fn normalize(self, defaults: &ElementConfig) -> CanvasRecord {
        let (x, y) = self.position.as_ref().map(RawPoint::resolve).unwrap_or_default();
        let scale = first_number([&self.scale, &self.zoom])
            .filter(|s| *s > 0.0)
            .unwrap_or(1.0);
        let elements: Vec<Element> = self
            .elements
            .into_iter()
            .map(|raw| raw.normalize(defaults))
            .collect();
        log::debug!("normalized canvas with {} elements", elements.len());
        CanvasRecord {
            id: self.id.unwrap_or_default(),
            position: Point::new(x.unwrap_or(0.0), y.unwrap_or(0.0)),
            scale,
            elements,
        }
    }
}

impl RawElement {
    /// Resolve into a fully populated element, defaulting what is missing.
    pub fn normalize(self, defaults: &ElementConfig) -> Element {
        let nested = self.position.as_ref().map(RawPoint::resolve).unwrap_or_default();
        let x = nested
            .0
            .or_else(|| first_number([&self.x, &self.x_upper, &self.pos_x]))
            .unwrap_or(0.0);
        let y = nested
            .1
            .or_else(|| first_number([&self.y, &self.y_upper, &self.pos_y]))
            .unwrap_or(0.0);

        let nested = self.size.as_ref().map(RawSize::resolve).unwrap_or_default();
        let width = nested
            .0
            .or_else(|| first_number([&self.width, &self.width_upper]))
            .filter(|w| *w > 0.0)
            .unwrap_or(defaults.default_width);
        let height = nested
            .1
            .or_else(|| first_number([&self.height, &self.height_upper]))
            .filter(|h| *h > 0.0)
            .unwrap_or(defaults.default_height);

        let rotation = first_number([&self.rotation]).unwrap_or(0.0);

        let image_ref = [self.image_ref, self.image_ref_camel, self.image_url, self.src]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(AssetRef::new);
        let content = self.content.or(self.text);

        let kind = match self.kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("image") => ElementKind::Image,
            Some("text") => ElementKind::Text,
            _ if image_ref.is_some() => ElementKind::Image,
            _ => ElementKind::Text,
        };

        let id = match self.id {
            Some(Value::String(s)) if !s.is_empty() => ElementId::new(s),
            Some(Value::Number(n)) => ElementId::new(n.to_string()),
            _ => ElementId::generate(),
        };

        let style = match self.style {
            Some(value) => serde_json::from_value::<ElementStyle>(value).unwrap_or_else(|e| {
                log::warn!("element {} has malformed style, using defaults: {}", id, e);
                ElementStyle::default()
            }),
            None => ElementStyle::default(),
        };

        Element {
            id,
            kind,
            position: Point::new(x, y),
            size: Size::new(width, height),
            rotation,
            style,
            image_ref,
            content,
            is_dragging: false,
        }
    }
}

/// First candidate that holds a finite number. Numeric strings count.
fn first_number<const N: usize>(candidates: [&Option<Value>; N]) -> Option<f64> {
    candidates.into_iter().flatten().find_map(|value| {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    })
}
