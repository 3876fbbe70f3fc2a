//! Ordered element collection.

use crate::element::{Element, ElementId, ElementStyle};
use crate::geometry::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Element store errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Duplicate element id: {0}")]
    DuplicateId(ElementId),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Partial update applied by [`ElementStore::update_by_id`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub rotation: Option<f64>,
    pub style: Option<ElementStyle>,
    pub content: Option<String>,
    #[serde(skip)]
    pub is_dragging: Option<bool>,
}

impl ElementPatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn dragging(is_dragging: bool) -> Self {
        Self {
            is_dragging: Some(is_dragging),
            ..Default::default()
        }
    }

    fn apply(self, element: &mut Element) {
        if let Some(position) = self.position {
            element.position = position;
        }
        if let Some(size) = self.size {
            element.size = size;
        }
        if let Some(rotation) = self.rotation {
            element.rotation = rotation;
        }
        if let Some(style) = self.style {
            element.style = style;
        }
        if let Some(content) = self.content {
            element.content = Some(content);
        }
        if let Some(is_dragging) = self.is_dragging {
            element.is_dragging = is_dragging;
        }
    }
}

/// Elements keyed by id, plus insertion order used as paint order.
#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: HashMap<ElementId, Element>,
    /// Back to front.
    z_order: Vec<ElementId>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already normalized elements. Later duplicates of an
    /// id are dropped.
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut store = Self::new();
        for element in elements {
            if let Err(e) = store.insert(element) {
                log::warn!("skipping element while loading: {}", e);
            }
        }
        store
    }

    /// Insert a new element on top. Rejects an id that is already present.
    pub fn insert(&mut self, element: Element) -> StoreResult<()> {
        if self.elements.contains_key(&element.id) {
            return Err(StoreError::DuplicateId(element.id));
        }
        self.z_order.push(element.id.clone());
        self.elements.insert(element.id.clone(), element);
        Ok(())
    }

    /// Apply a patch. Returns `false` when the id is absent, which happens
    /// routinely for commits that arrive after a delete.
    pub fn update_by_id(&mut self, id: &ElementId, patch: ElementPatch) -> bool {
        match self.elements.get_mut(id) {
            Some(element) => {
                patch.apply(element);
                true
            }
            None => {
                log::debug!("update for missing element {}", id);
                false
            }
        }
    }

    /// Remove an element, returning it if it was present.
    pub fn remove_by_id(&mut self, id: &ElementId) -> Option<Element> {
        self.z_order.retain(|z| z != id);
        self.elements.remove(id)
    }

    /// Elements in paint order (back to front).
    pub fn all(&self) -> impl Iterator<Item = &Element> {
        self.z_order.iter().filter_map(|id| self.elements.get(id))
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.z_order.clear();
    }

    /// Move an element to the top of the paint order.
    pub fn bring_to_front(&mut self, id: &ElementId) -> bool {
        if !self.elements.contains_key(id) {
            return false;
        }
        self.z_order.retain(|z| z != id);
        self.z_order.push(id.clone());
        true
    }

    /// Topmost element under a logical point.
    pub fn element_at(&self, point: Point, tolerance: f64) -> Option<&Element> {
        self.z_order
            .iter()
            .rev()
            .filter_map(|id| self.elements.get(id))
            .find(|el| el.hit_test(point, tolerance))
    }

    /// Union of all element bounds.
    pub fn bounds(&self) -> Option<Rect> {
        self.all().map(Element::bounds).reduce(|a, b| a.union(b))
    }
}
