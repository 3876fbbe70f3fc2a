//! Single-element selection and the drag/resize/rotate state machine.
//!
//! In-flight gestures never touch the element store. The store only sees the
//! finalized geometry when a gesture ends, when the selection moves to another
//! element, or when the selection is cleared.

use crate::assets::AssetCache;
use crate::element::{Element, ElementId};
use crate::geometry::{Point, Size, Vec2, normalize_degrees};
use crate::store::{ElementPatch, ElementStore};
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 10.0;
/// Distance from the top edge to the rotation handle (logical units).
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;

/// Type of transform handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    Rotate,
}

impl HandleKind {
    /// Outward direction of a corner along the local axes.
    fn corner_signs(self) -> Option<(f64, f64)> {
        match self {
            HandleKind::TopLeft => Some((-1.0, -1.0)),
            HandleKind::TopRight => Some((1.0, -1.0)),
            HandleKind::BottomRight => Some((1.0, 1.0)),
            HandleKind::BottomLeft => Some((-1.0, 1.0)),
            HandleKind::Rotate => None,
        }
    }
}

/// A transform handle with its position in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub kind: HandleKind,
    pub position: Point,
}

/// Handles for an element, in its rotated frame.
pub fn handles(element: &Element) -> Vec<Handle> {
    let (w, h) = (element.size.width, element.size.height);
    let local = [
        (HandleKind::TopLeft, Point::new(0.0, 0.0)),
        (HandleKind::TopRight, Point::new(w, 0.0)),
        (HandleKind::BottomRight, Point::new(w, h)),
        (HandleKind::BottomLeft, Point::new(0.0, h)),
        (HandleKind::Rotate, Point::new(w / 2.0, -ROTATE_HANDLE_OFFSET)),
    ];
    local
        .into_iter()
        .map(|(kind, p)| Handle {
            kind,
            position: element.local_to_world(p),
        })
        .collect()
}

/// Find which handle (if any) is hit at the given logical point.
/// `tolerance` should already be adjusted for the viewport scale.
pub fn hit_test_handles(element: &Element, point: Point, tolerance: f64) -> Option<HandleKind> {
    handles(element)
        .into_iter()
        .find(|h| (h.position - point).hypot2() <= tolerance * tolerance)
        .map(|h| h.kind)
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Background,
    Element(ElementId),
    Handle(HandleKind),
}

/// Controller state, derived from selection and gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Idle,
    Selected,
    Transforming,
}

/// Result of committing a transform to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// The resize fell below the minimum size; geometry was kept.
    Rejected,
    /// The element no longer exists.
    NotFound,
}

/// Raw transform held by the resize/rotate widget between commits.
///
/// Scale factors are relative to the element's stored size and are reset to
/// 1 after every commit, so size lives only in width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl PendingTransform {
    /// Transform that leaves `element` as it is.
    pub fn identity_for(element: &Element) -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            x: element.position.x,
            y: element.position.y,
            rotation: element.rotation,
        }
    }

    fn is_identity_for(&self, element: &Element) -> bool {
        *self == Self::identity_for(element)
    }
}

/// Apply the aspect-lock policy to raw scale factors.
///
/// With the lock on, both axes take the factor with the larger magnitude.
pub fn resolve_scale(raw_x: f64, raw_y: f64, free_resize: bool) -> (f64, f64) {
    if free_resize {
        (raw_x.abs(), raw_y.abs())
    } else {
        let s = raw_x.abs().max(raw_y.abs());
        (s, s)
    }
}

/// An in-progress pointer gesture on the selected element.
#[derive(Debug, Clone)]
enum Gesture {
    Drag {
        id: ElementId,
        /// Element position minus pointer position at grab time.
        grab_offset: Vec2,
        position: Point,
    },
    Resize {
        handle: HandleKind,
        origin: Element,
        last_pointer: Point,
    },
    Rotate {
        origin: Element,
    },
}

/// Tracks the selected element and its transform gestures.
#[derive(Debug, Clone)]
pub struct SelectionController {
    selected: Option<ElementId>,
    free_resize: bool,
    pending: Option<PendingTransform>,
    gesture: Option<Gesture>,
    min_size: f64,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl SelectionController {
    pub fn new(min_size: f64) -> Self {
        Self {
            selected: None,
            free_resize: false,
            pending: None,
            gesture: None,
            min_size,
        }
    }

    pub fn selected(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &ElementId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    pub fn free_resize(&self) -> bool {
        self.free_resize
    }

    pub fn pending(&self) -> Option<&PendingTransform> {
        self.pending.as_ref()
    }

    pub fn mode(&self) -> SelectionMode {
        match (&self.selected, &self.gesture) {
            (None, _) => SelectionMode::Idle,
            (Some(_), None) => SelectionMode::Selected,
            (Some(_), Some(_)) => SelectionMode::Transforming,
        }
    }

    /// Whether a pointer gesture is being tracked.
    pub fn is_transforming(&self) -> bool {
        self.gesture.is_some()
    }

    /// Select an element, committing whatever the previous selection had in
    /// flight first. Returns `false` if the id is not in the store.
    pub fn select(&mut self, store: &mut ElementStore, id: &ElementId) -> bool {
        if self.is_selected(id) {
            return true;
        }
        if !store.contains(id) {
            return false;
        }
        self.commit_pending(store);
        log::debug!("select {}", id);
        self.selected = Some(id.clone());
        self.pending = store.get(id).map(PendingTransform::identity_for);
        true
    }

    /// Commit anything in flight and drop the selection.
    pub fn clear(&mut self, store: &mut ElementStore) {
        self.commit_pending(store);
        self.selected = None;
        self.pending = None;
        self.free_resize = false;
    }

    /// Clear the selection when a pointer-down hit the background.
    pub fn deselect_if_clicked_empty(&mut self, store: &mut ElementStore, hit: &HitTarget) -> bool {
        if *hit != HitTarget::Background || self.selected.is_none() {
            return false;
        }
        self.clear(store);
        true
    }

    /// Track the free-resize modifier. Ignored while nothing is selected.
    pub fn set_free_resize(&mut self, free: bool) {
        if self.selected.is_none() {
            return;
        }
        self.free_resize = free;
        // Re-run the preview so the lock change shows without a pointer move
        if let Some(Gesture::Resize { last_pointer, .. }) = &self.gesture {
            let pointer = *last_pointer;
            self.resize_to(pointer);
        }
    }

    /// Commit any in-flight drag and any non-identity pending transform.
    pub fn commit_pending(&mut self, store: &mut ElementStore) {
        match self.gesture.take() {
            Some(Gesture::Drag { id, position, .. }) => {
                self.write_drag(store, &id, position);
            }
            Some(_) | None => {}
        }
        let (Some(id), Some(pending)) = (self.selected.clone(), self.pending) else {
            return;
        };
        let Some(element) = store.get(&id) else {
            return;
        };
        if !pending.is_identity_for(element) {
            self.commit_resize(
                store,
                &id,
                pending.scale_x,
                pending.scale_y,
                pending.x,
                pending.y,
                pending.rotation,
            );
        }
    }

    /// Start dragging the element under the pointer.
    pub fn begin_drag(&mut self, store: &mut ElementStore, id: &ElementId, pointer: Point) -> bool {
        if !self.select(store, id) {
            return false;
        }
        let Some(element) = store.get(id) else {
            return false;
        };
        let position = element.position;
        self.gesture = Some(Gesture::Drag {
            id: id.clone(),
            grab_offset: position - pointer,
            position,
        });
        store.update_by_id(id, ElementPatch::dragging(true));
        true
    }

    /// Follow the pointer during a drag. Only the last position counts.
    pub fn drag_to(&mut self, pointer: Point) {
        if let Some(Gesture::Drag {
            grab_offset,
            position,
            ..
        }) = &mut self.gesture
        {
            *position = pointer + *grab_offset;
        }
    }

    /// Position the in-flight drag would commit, if a drag is active.
    pub fn drag_position(&self) -> Option<Point> {
        match &self.gesture {
            Some(Gesture::Drag { position, .. }) => Some(*position),
            _ => None,
        }
    }

    /// Write the final drag position to the store and return to Selected.
    pub fn commit_drag(&mut self, store: &mut ElementStore, id: &ElementId, x: f64, y: f64) -> CommitOutcome {
        if matches!(&self.gesture, Some(Gesture::Drag { id: g, .. }) if g == id) {
            self.gesture = None;
        }
        self.write_drag(store, id, Point::new(x, y))
    }

    fn write_drag(&mut self, store: &mut ElementStore, id: &ElementId, position: Point) -> CommitOutcome {
        let patch = ElementPatch {
            position: Some(position),
            is_dragging: Some(false),
            ..Default::default()
        };
        if !store.update_by_id(id, patch) {
            return CommitOutcome::NotFound;
        }
        log::debug!("drag committed for {} at ({}, {})", id, position.x, position.y);
        if self.is_selected(id) {
            self.pending = store.get(id).map(PendingTransform::identity_for);
        }
        CommitOutcome::Applied
    }

    /// Start a resize or rotate gesture on the selected element.
    pub fn begin_handle(&mut self, store: &ElementStore, handle: HandleKind, pointer: Point) -> bool {
        let Some(origin) = self.selected.as_ref().and_then(|id| store.get(id)).cloned() else {
            return false;
        };
        self.pending = Some(PendingTransform::identity_for(&origin));
        self.gesture = Some(match handle {
            HandleKind::Rotate => Gesture::Rotate { origin },
            corner => Gesture::Resize {
                handle: corner,
                origin,
                last_pointer: pointer,
            },
        });
        true
    }

    /// Update the pending transform from a corner drag.
    ///
    /// The pointer is projected into the element's rotated frame and the
    /// opposite corner stays fixed.
    pub fn resize_to(&mut self, pointer: Point) {
        let free = self.free_resize;
        let Some(Gesture::Resize {
            handle,
            origin,
            last_pointer,
        }) = &mut self.gesture
        else {
            return;
        };
        *last_pointer = pointer;
        let Some((sign_x, sign_y)) = handle.corner_signs() else {
            return;
        };

        let (w, h) = (origin.size.width, origin.size.height);
        let anchor = Point::new(
            if sign_x > 0.0 { 0.0 } else { w },
            if sign_y > 0.0 { 0.0 } else { h },
        );
        let local = origin.world_to_local(pointer);
        let raw_x = if w > 0.0 { sign_x * (local.x - anchor.x) / w } else { 1.0 };
        let raw_y = if h > 0.0 { sign_y * (local.y - anchor.y) / h } else { 1.0 };

        let (sx, sy) = resolve_scale(raw_x, raw_y, free);
        let new_size = Size::new(w * sx, h * sy);
        let top_left = Point::new(
            if sign_x > 0.0 { anchor.x } else { anchor.x - new_size.width },
            if sign_y > 0.0 { anchor.y } else { anchor.y - new_size.height },
        );
        let half = Vec2::new(new_size.width / 2.0, new_size.height / 2.0);
        let center = origin.local_to_world(top_left + half);
        let position = center - half;

        self.pending = Some(PendingTransform {
            scale_x: raw_x,
            scale_y: raw_y,
            x: position.x,
            y: position.y,
            rotation: origin.rotation,
        });
    }

    /// Update the pending rotation so the rotate handle tracks the pointer.
    pub fn rotate_to(&mut self, pointer: Point) {
        let Some(Gesture::Rotate { origin }) = &self.gesture else {
            return;
        };
        let d = pointer - origin.center();
        if d.hypot2() == 0.0 {
            return;
        }
        // Offset so that 0 degrees points up
        let angle = normalize_degrees(d.y.atan2(d.x).to_degrees() + 90.0);
        self.pending = Some(PendingTransform {
            rotation: angle,
            ..PendingTransform::identity_for(origin)
        });
    }

    /// Finish the current gesture, committing its result.
    pub fn end_gesture(&mut self, store: &mut ElementStore) -> Option<(ElementId, CommitOutcome)> {
        let gesture = self.gesture.take()?;
        match gesture {
            Gesture::Drag { id, position, .. } => {
                let outcome = self.write_drag(store, &id, position);
                Some((id, outcome))
            }
            Gesture::Resize { origin, .. } | Gesture::Rotate { origin } => {
                let pending = self.pending.unwrap_or_else(|| PendingTransform::identity_for(&origin));
                let outcome = self.commit_resize(
                    store,
                    &origin.id,
                    pending.scale_x,
                    pending.scale_y,
                    pending.x,
                    pending.y,
                    pending.rotation,
                );
                Some((origin.id, outcome))
            }
        }
    }

    /// Commit a resize/rotate. Width and height absorb the scale factors and
    /// the pending transform is reset so scale never compounds.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_resize(
        &mut self,
        store: &mut ElementStore,
        id: &ElementId,
        raw_scale_x: f64,
        raw_scale_y: f64,
        raw_x: f64,
        raw_y: f64,
        raw_rotation: f64,
    ) -> CommitOutcome {
        if matches!(&self.gesture, Some(Gesture::Resize { origin, .. } | Gesture::Rotate { origin }) if origin.id == *id)
        {
            self.gesture = None;
        }
        let Some(element) = store.get(id) else {
            return CommitOutcome::NotFound;
        };
        let (sx, sy) = resolve_scale(raw_scale_x, raw_scale_y, self.free_resize);
        let size = Size::new(
            (element.size.width * sx).abs(),
            (element.size.height * sy).abs(),
        );
        let valid = [size.width, size.height, raw_x, raw_y, raw_rotation]
            .iter()
            .all(|v| v.is_finite());

        let outcome = if !valid || size.width < self.min_size || size.height < self.min_size {
            log::debug!(
                "resize of {} rejected ({} x {} below {})",
                id,
                size.width,
                size.height,
                self.min_size
            );
            CommitOutcome::Rejected
        } else {
            let patch = ElementPatch {
                position: Some(Point::new(raw_x, raw_y)),
                size: Some(size),
                rotation: Some(normalize_degrees(raw_rotation)),
                ..Default::default()
            };
            store.update_by_id(id, patch);
            log::debug!("resize committed for {}: {} x {}", id, size.width, size.height);
            CommitOutcome::Applied
        };

        if self.is_selected(id) {
            self.pending = store.get(id).map(PendingTransform::identity_for);
        }
        outcome
    }

    /// Remove the selected element. The asset delete is best effort and the
    /// local removal happens regardless of its result.
    pub fn delete_selected(&mut self, store: &mut ElementStore, assets: &mut AssetCache) -> Option<Element> {
        let id = self.selected.take()?;
        self.gesture = None;
        self.pending = None;
        self.free_resize = false;
        let removed = store.remove_by_id(&id)?;
        assets.forget(&id);
        if let Some(asset) = &removed.image_ref {
            assets.release(asset.clone());
        }
        log::debug!("deleted {}", id);
        Some(removed)
    }

    /// The element as it should be displayed, with any in-flight gesture
    /// applied on top of the stored geometry.
    pub fn preview(&self, element: &Element) -> Element {
        let mut shown = element.clone();
        if !self.is_selected(&element.id) {
            return shown;
        }
        if let Some(position) = self.drag_position() {
            shown.position = position;
            return shown;
        }
        if let Some(pending) = &self.pending {
            let (sx, sy) = resolve_scale(pending.scale_x, pending.scale_y, self.free_resize);
            shown.size = Size::new(element.size.width * sx, element.size.height * sy);
            shown.position = Point::new(pending.x, pending.y);
            shown.rotation = pending.rotation;
        }
        shown
    }
}
