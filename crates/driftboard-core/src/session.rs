//! A canvas session: owns the board state and turns raw input into
//! viewport, selection and store changes.

use crate::assets::{AssetCache, AssetEvent, AssetStorage};
use crate::config::BoardConfig;
use crate::element::{AssetRef, Element, ElementId};
use crate::events::{BoardEvent, EventDispatcher, SubscriptionId};
use crate::geometry::{Point, Rect, Size};
use crate::input::{InputEvent, InputState, Key, MouseButton};
use crate::selection::{
    CommitOutcome, HANDLE_HIT_TOLERANCE, HitTarget, SelectionController, hit_test_handles,
};
use crate::storage::CanvasRecord;
use crate::store::{ElementStore, StoreResult};
use crate::viewport::{Viewport, ZoomDirection};
use std::sync::Arc;

/// Default view size until the host reports one.
const DEFAULT_VIEW_SIZE: Size = Size::new(1280.0, 800.0);

/// Owns the state of one open canvas.
pub struct BoardSession {
    id: String,
    config: BoardConfig,
    viewport: Viewport,
    store: ElementStore,
    selection: SelectionController,
    assets: AssetCache,
    input: InputState,
    dispatcher: EventDispatcher,
    view_size: Size,
    /// Button driving an in-progress pan.
    panning: Option<MouseButton>,
}

impl std::fmt::Debug for BoardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("id", &self.id)
            .field("elements", &self.store.len())
            .field("selected", &self.selection.selected())
            .finish()
    }
}

impl BoardSession {
    /// An invalid config is replaced by the defaults.
    pub fn new(config: BoardConfig, assets: Arc<dyn AssetStorage>) -> Self {
        let config = config.or_default();
        Self {
            id: String::new(),
            config,
            viewport: Viewport::new(config.viewport),
            store: ElementStore::new(),
            selection: SelectionController::new(config.elements.min_size),
            assets: AssetCache::new(assets),
            input: InputState::new(),
            dispatcher: EventDispatcher::new(),
            view_size: DEFAULT_VIEW_SIZE,
            panning: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn view_size(&self) -> Size {
        self.view_size
    }

    pub fn set_view_size(&mut self, size: Size) {
        if size.width > 0.0 && size.height > 0.0 {
            self.view_size = size;
        }
    }

    /// Logical area currently on screen.
    pub fn visible_bounds(&self) -> Rect {
        self.viewport
            .visible_logical_bounds(self.view_size.width, self.view_size.height)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&BoardEvent) + 'static,
    {
        self.dispatcher.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    fn emit(&mut self, event: BoardEvent) {
        self.dispatcher.emit(&event);
    }

    fn emit_viewport(&mut self) {
        let view = self.viewport.view_transform();
        self.emit(BoardEvent::ViewportChanged(view));
    }

    /// Apply a loaded canvas. Elements are replaced every time; the persisted
    /// viewport is honoured only on the first load.
    pub fn load_canvas(&mut self, record: CanvasRecord) {
        self.selection.clear(&mut self.store);
        self.id = record.id;
        self.store = ElementStore::from_elements(record.elements);
        self.assets.sync(self.store.all());
        log::info!("loaded canvas {:?} with {} elements", self.id, self.store.len());

        if self.viewport.set_from_persisted(record.scale, record.position.to_vec2()) {
            self.emit_viewport();
        }
        self.emit(BoardEvent::SelectionChanged(None));
    }

    /// Snapshot of the stored state for saving. In-flight gestures are not
    /// included; call [`BoardSession::commit_pending`] first to include them.
    pub fn to_record(&self) -> CanvasRecord {
        CanvasRecord {
            id: self.id.clone(),
            position: self.viewport.translation().to_point(),
            scale: self.viewport.scale(),
            elements: self.store.all().cloned().collect(),
        }
    }

    /// Write any in-flight transform to the store.
    pub fn commit_pending(&mut self) {
        self.selection.commit_pending(&mut self.store);
    }

    /// Add an element on top and start loading its asset.
    pub fn insert_element(&mut self, element: Element) -> StoreResult<()> {
        self.assets.request(&element);
        let id = element.id.clone();
        self.store.insert(element)?;
        self.emit(BoardEvent::ElementCommitted(id));
        Ok(())
    }

    /// Drop an uploaded image with its center at a screen point.
    pub fn insert_image(&mut self, asset: AssetRef, screen: Point) -> StoreResult<ElementId> {
        let size = Size::new(
            self.config.elements.default_width,
            self.config.elements.default_height,
        );
        let center = self.viewport.screen_to_logical(screen);
        let position = Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0);
        let id = ElementId::generate();
        self.insert_element(Element::image(id.clone(), asset, position, size))?;
        Ok(id)
    }

    /// Elements in paint order as they should be displayed, with in-flight
    /// gestures applied.
    pub fn display_elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.store.all().map(|el| self.selection.preview(el))
    }

    /// Fit the view around all content.
    pub fn fit_to_content(&mut self, padding: f64) {
        let Some(bounds) = self.store.bounds() else {
            return;
        };
        self.viewport.fit_to_bounds(bounds, self.view_size, padding);
        self.emit_viewport();
    }

    fn hit_target(&self, logical: Point) -> HitTarget {
        let tolerance = HANDLE_HIT_TOLERANCE / self.viewport.scale();
        let selected = self.selection.selected().and_then(|id| self.store.get(id));
        if let Some(kind) = selected.and_then(|el| hit_test_handles(el, logical, tolerance)) {
            return HitTarget::Handle(kind);
        }
        match self.store.element_at(logical, 0.0) {
            Some(el) => HitTarget::Element(el.id.clone()),
            None => HitTarget::Background,
        }
    }

    pub fn on_wheel(&mut self, screen: Point, delta_y: f64) {
        self.input.move_pointer(screen);
        let Some(direction) = ZoomDirection::from_wheel_delta(delta_y) else {
            return;
        };
        if self.viewport.zoom_at(Some(screen), direction) {
            self.emit_viewport();
        }
    }

    pub fn on_pointer_down(&mut self, screen: Point, button: MouseButton) {
        self.input.move_pointer(screen);
        self.input.press_button(button);

        if button == MouseButton::Middle {
            self.panning = Some(button);
            return;
        }
        if button != MouseButton::Left {
            return;
        }

        let logical = self.viewport.screen_to_logical(screen);
        let before = self.selection.selected().cloned();
        match self.hit_target(logical) {
            HitTarget::Handle(kind) => {
                self.selection.begin_handle(&self.store, kind, logical);
            }
            HitTarget::Element(id) => {
                self.selection.begin_drag(&mut self.store, &id, logical);
            }
            HitTarget::Background => {
                self.selection
                    .deselect_if_clicked_empty(&mut self.store, &HitTarget::Background);
                self.panning = Some(button);
            }
        }
        // Shift may have gone down before anything was selected
        self.selection
            .set_free_resize(self.input.is_key_down(Key::Shift));
        let after = self.selection.selected().cloned();
        if before != after {
            if let Some(prev) = before {
                self.emit(BoardEvent::ElementCommitted(prev));
            }
            self.emit(BoardEvent::SelectionChanged(after));
        }
    }

    pub fn on_pointer_move(&mut self, screen: Point) {
        let delta = self.input.move_pointer(screen);
        if self.panning.is_some() {
            self.viewport.pan_by(delta);
            self.emit_viewport();
            return;
        }
        if self.selection.is_transforming() {
            let logical = self.viewport.screen_to_logical(screen);
            self.track_gesture(logical);
        }
    }

    fn track_gesture(&mut self, logical: Point) {
        // Only the matching gesture reacts
        self.selection.drag_to(logical);
        self.selection.resize_to(logical);
        self.selection.rotate_to(logical);
    }

    pub fn on_pointer_up(&mut self, screen: Point, button: MouseButton) {
        self.on_pointer_move(screen);
        self.input.release_button(button);
        if self.panning == Some(button) {
            self.panning = None;
            return;
        }
        if button != MouseButton::Left {
            return;
        }
        let Some((id, outcome)) = self.selection.end_gesture(&mut self.store) else {
            return;
        };
        match outcome {
            CommitOutcome::Applied => self.emit(BoardEvent::ElementCommitted(id)),
            CommitOutcome::Rejected => self.emit(BoardEvent::ResizeRejected(id)),
            CommitOutcome::NotFound => log::debug!("gesture ended on removed element {}", id),
        }
    }

    pub fn on_key_down(&mut self, name: &str) {
        let key = Key::from_name(name);
        let first_press = self.input.press_key(key);
        match key {
            Key::Shift => self.selection.set_free_resize(true),
            Key::Escape if self.selection.selected().is_some() => {
                self.selection.clear(&mut self.store);
                self.emit(BoardEvent::SelectionChanged(None));
            }
            Key::Delete if first_press => self.delete_selected(),
            Key::ZoomIn | Key::ZoomOut => {
                let direction = if key == Key::ZoomIn {
                    ZoomDirection::In
                } else {
                    ZoomDirection::Out
                };
                if self.viewport.zoom_at(self.input.pointer_position(), direction) {
                    self.emit_viewport();
                }
            }
            Key::ResetZoom => {
                self.viewport.reset();
                self.emit_viewport();
            }
            _ => {}
        }
    }

    pub fn on_key_up(&mut self, name: &str) {
        let key = Key::from_name(name);
        self.input.release_key(key);
        if key == Key::Shift {
            self.selection.set_free_resize(false);
        }
    }

    /// Remove the selected element, if any.
    pub fn delete_selected(&mut self) {
        if let Some(removed) = self.selection.delete_selected(&mut self.store, &mut self.assets) {
            self.emit(BoardEvent::ElementRemoved(removed.id));
            self.emit(BoardEvent::SelectionChanged(None));
        }
    }

    /// Dispatch a raw event to the matching handler.
    pub fn handle(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Wheel { x, y, delta_y } => self.on_wheel(Point::new(*x, *y), *delta_y),
            InputEvent::PointerDown { x, y, button } => {
                self.on_pointer_down(Point::new(*x, *y), *button)
            }
            InputEvent::PointerMove { x, y } => self.on_pointer_move(Point::new(*x, *y)),
            InputEvent::PointerUp { x, y, button } => {
                self.on_pointer_up(Point::new(*x, *y), *button)
            }
            InputEvent::KeyDown { key } => self.on_key_down(key),
            InputEvent::KeyUp { key } => self.on_key_up(key),
            InputEvent::Resize { width, height } => {
                self.set_view_size(Size::new(*width, *height))
            }
        }
    }

    /// Merge finished asset work. Returns how many completions were seen.
    pub fn pump_assets(&mut self) -> usize {
        let events = self.assets.pump();
        let count = events.len();
        for event in events {
            let board_event = match event {
                AssetEvent::Resolved(id) => BoardEvent::AssetResolved(id),
                AssetEvent::Failed { id, error } => BoardEvent::AssetFailed {
                    id,
                    message: error.to_string(),
                },
                AssetEvent::DeleteFailed { asset, error } => BoardEvent::AssetDeleteFailed {
                    asset,
                    message: error.to_string(),
                },
            };
            self.emit(board_event);
        }
        count
    }

    /// Tear down: commit what is in flight and drop every listener.
    pub fn close(&mut self) {
        self.selection.commit_pending(&mut self.store);
        self.dispatcher.clear();
        self.panning = None;
        log::debug!("session {:?} closed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, AssetResult, MemoryAssetStorage};
    use crate::storage::BoxFuture;
    use crate::geometry::Vec2;
    use crate::selection::SelectionMode;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session_with(elements: Vec<Element>) -> BoardSession {
        let mut session = BoardSession::new(
            BoardConfig::default(),
            Arc::new(MemoryAssetStorage::new()),
        );
        let mut record = CanvasRecord::new("board");
        record.elements = elements;
        session.load_canvas(record);
        session
    }

    fn text(id: &str, x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::text(ElementId::new(id), id, Point::new(x, y), Size::new(w, h))
    }

    fn recorder(session: &mut BoardSession) -> Rc<RefCell<Vec<BoardEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn test_wheel_zoom_anchors_at_pointer() {
        let mut session = session_with(vec![]);
        let events = recorder(&mut session);
        session.handle(&InputEvent::Wheel {
            x: 400.0,
            y: 300.0,
            delta_y: -1.0,
        });
        let view = session.viewport().view_transform();
        assert!((view.scale - 1.1).abs() < 1e-9);
        assert!((view.translation.x + 40.0).abs() < 1e-9);
        assert!((view.translation.y + 30.0).abs() < 1e-9);
        assert!(matches!(events.borrow()[0], BoardEvent::ViewportChanged(_)));
    }

    #[test]
    fn test_keyboard_zoom_needs_pointer() {
        let mut session = session_with(vec![]);
        session.on_key_down("+");
        assert!((session.viewport().scale() - 1.0).abs() < f64::EPSILON);

        session.on_pointer_move(Point::new(100.0, 100.0));
        session.on_key_down("+");
        assert!((session.viewport().scale() - 1.1).abs() < 1e-9);
        let anchored = session.viewport().screen_to_logical(Point::new(100.0, 100.0));
        assert!((anchored.x - 100.0).abs() < 1e-9);

        session.on_key_down("0");
        assert!((session.viewport().scale() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_drag_element_commits_on_release() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        session.on_pointer_down(Point::new(10.0, 10.0), MouseButton::Left);
        assert_eq!(session.selection().mode(), SelectionMode::Transforming);
        session.on_pointer_move(Point::new(30.0, 10.0));
        session.on_pointer_move(Point::new(60.0, 40.0));

        let shown: Vec<_> = session.display_elements().collect();
        assert_eq!(shown[0].position, Point::new(50.0, 30.0));
        let id = ElementId::new("a");
        assert_eq!(session.store().get(&id).unwrap().position, Point::ZERO);

        session.on_pointer_up(Point::new(60.0, 40.0), MouseButton::Left);
        let el = session.store().get(&id).unwrap();
        assert_eq!(el.position, Point::new(50.0, 30.0));
        assert!(!el.is_dragging);
        assert_eq!(session.selection().mode(), SelectionMode::Selected);
    }

    #[test]
    fn test_drag_respects_zoom() {
        let mut session = BoardSession::new(
            BoardConfig::default(),
            Arc::new(MemoryAssetStorage::new()),
        );
        let mut record = CanvasRecord::new("board");
        record.scale = 2.0;
        record.elements.push(text("a", 0.0, 0.0, 100.0, 50.0));
        session.load_canvas(record);
        session.on_pointer_down(Point::new(20.0, 20.0), MouseButton::Left);
        session.on_pointer_up(Point::new(60.0, 20.0), MouseButton::Left);
        // 40 screen px at scale 2 is 20 logical units
        assert_eq!(
            session.store().get(&ElementId::new("a")).unwrap().position,
            Point::new(20.0, 0.0)
        );
    }

    #[test]
    fn test_background_drag_pans_and_deselects() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        session.on_pointer_down(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_pointer_up(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_key_down("Shift");
        assert!(session.selection().free_resize());

        session.on_pointer_down(Point::new(500.0, 500.0), MouseButton::Left);
        assert_eq!(session.selection().selected(), None);
        assert!(!session.selection().free_resize());
        session.on_pointer_move(Point::new(520.0, 490.0));
        session.on_pointer_up(Point::new(530.0, 480.0), MouseButton::Left);
        assert_eq!(session.viewport().translation(), Vec2::new(30.0, -20.0));
    }

    #[test]
    fn test_shift_resize_through_handle() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        // Select, then grab the bottom-right handle
        session.on_pointer_down(Point::new(50.0, 25.0), MouseButton::Left);
        session.on_pointer_up(Point::new(50.0, 25.0), MouseButton::Left);
        session.on_key_down("Shift");
        session.on_pointer_down(Point::new(100.0, 50.0), MouseButton::Left);
        session.on_pointer_move(Point::new(200.0, 60.0));
        session.on_pointer_up(Point::new(200.0, 60.0), MouseButton::Left);
        let el = session.store().get(&ElementId::new("a")).unwrap();
        assert!((el.size.width - 200.0).abs() < 1e-9);
        assert!((el.size.height - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_shift_held_before_selecting_unlocks_resize() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        session.on_key_down("Shift");
        assert!(!session.selection().free_resize());
        session.on_pointer_down(Point::new(50.0, 25.0), MouseButton::Left);
        session.on_pointer_up(Point::new(50.0, 25.0), MouseButton::Left);
        assert!(session.selection().free_resize());

        session.on_pointer_down(Point::new(100.0, 50.0), MouseButton::Left);
        session.on_pointer_move(Point::new(200.0, 60.0));
        session.on_pointer_up(Point::new(200.0, 60.0), MouseButton::Left);
        let el = session.store().get(&ElementId::new("a")).unwrap();
        assert!((el.size.width - 200.0).abs() < 1e-9);
        assert!((el.size.height - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_other_button_release_keeps_drag_alive() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        let id = ElementId::new("a");
        session.on_pointer_down(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_pointer_move(Point::new(50.0, 10.0));
        session.on_pointer_up(Point::new(50.0, 10.0), MouseButton::Right);
        assert_eq!(session.selection().mode(), SelectionMode::Transforming);
        assert_eq!(session.store().get(&id).unwrap().position, Point::ZERO);

        session.on_pointer_up(Point::new(60.0, 10.0), MouseButton::Left);
        assert_eq!(session.selection().mode(), SelectionMode::Selected);
        assert_eq!(session.store().get(&id).unwrap().position, Point::new(50.0, 0.0));
    }

    #[test]
    fn test_pan_ends_only_with_its_own_button() {
        let mut session = session_with(vec![]);
        session.on_pointer_down(Point::new(0.0, 0.0), MouseButton::Middle);
        session.on_pointer_up(Point::new(0.0, 0.0), MouseButton::Left);
        session.on_pointer_move(Point::new(10.0, 5.0));
        assert_eq!(session.viewport().translation(), Vec2::new(10.0, 5.0));

        session.on_pointer_up(Point::new(10.0, 5.0), MouseButton::Middle);
        session.on_pointer_move(Point::new(50.0, 50.0));
        assert_eq!(session.viewport().translation(), Vec2::new(10.0, 5.0));
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let mut config = BoardConfig::default();
        config.viewport.min_scale = 2.0;
        config.viewport.max_scale = 1.0;
        let mut session = BoardSession::new(config, Arc::new(MemoryAssetStorage::new()));
        assert_eq!(*session.config(), BoardConfig::default());
        session.on_wheel(Point::new(10.0, 10.0), -1.0);
        assert!((session.viewport().scale() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_tiny_resize_is_rejected_through_handle() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        let events = recorder(&mut session);
        session.on_pointer_down(Point::new(50.0, 25.0), MouseButton::Left);
        session.on_pointer_up(Point::new(50.0, 25.0), MouseButton::Left);
        session.on_pointer_down(Point::new(100.0, 50.0), MouseButton::Left);
        session.on_pointer_up(Point::new(1.0, 1.0), MouseButton::Left);
        let el = session.store().get(&ElementId::new("a")).unwrap();
        assert_eq!(el.size, Size::new(100.0, 50.0));
        assert_eq!(el.position, Point::ZERO);
        assert!(events
            .borrow()
            .contains(&BoardEvent::ResizeRejected(ElementId::new("a"))));
    }

    struct OfflineAssets;

    impl AssetStorage for OfflineAssets {
        fn upload(&self, _bytes: Vec<u8>) -> BoxFuture<'static, AssetResult<AssetRef>> {
            Box::pin(async { Err(AssetError::Io("offline".to_string())) })
        }

        fn fetch(&self, _asset: &AssetRef) -> BoxFuture<'static, AssetResult<Vec<u8>>> {
            Box::pin(async { Err(AssetError::Io("offline".to_string())) })
        }

        fn delete(&self, _asset: &AssetRef) -> BoxFuture<'static, AssetResult<()>> {
            Box::pin(async { Err(AssetError::Io("offline".to_string())) })
        }
    }

    #[test]
    fn test_delete_survives_failed_asset_delete() {
        let mut session = BoardSession::new(BoardConfig::default(), Arc::new(OfflineAssets));
        let mut record = CanvasRecord::new("board");
        record.elements.push(Element::image(
            ElementId::new("pic"),
            AssetRef::new("pic.png"),
            Point::ZERO,
            Size::new(100.0, 100.0),
        ));
        session.load_canvas(record);
        session.pump_assets();
        let events = recorder(&mut session);

        session.on_pointer_down(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_pointer_up(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_key_down("Delete");
        assert!(session.store().is_empty());
        assert_eq!(session.selection().selected(), None);

        session.pump_assets();
        assert!(events.borrow().contains(&BoardEvent::AssetDeleteFailed {
            asset: AssetRef::new("pic.png"),
            message: AssetError::Io("offline".to_string()).to_string(),
        }));
        assert!(session.assets().is_idle());
    }

    #[test]
    fn test_delete_key_removes_selected() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        let events = recorder(&mut session);
        session.on_pointer_down(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_pointer_up(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_key_down("Delete");
        assert_eq!(session.selection().selected(), None);
        assert_eq!(session.store().all().count(), 0);
        assert!(events
            .borrow()
            .contains(&BoardEvent::ElementRemoved(ElementId::new("a"))));
    }

    #[test]
    fn test_escape_deselects() {
        let mut session = session_with(vec![text("a", 0.0, 0.0, 100.0, 50.0)]);
        session.on_pointer_down(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_pointer_up(Point::new(10.0, 10.0), MouseButton::Left);
        session.on_key_down("Escape");
        assert_eq!(session.selection().selected(), None);
    }

    #[test]
    fn test_persisted_viewport_applies_once() {
        let mut session = BoardSession::new(
            BoardConfig::default(),
            Arc::new(MemoryAssetStorage::new()),
        );
        let mut record = CanvasRecord::new("board");
        record.scale = 2.0;
        record.position = Point::new(10.0, 20.0);
        session.load_canvas(record.clone());
        record.scale = 3.0;
        record.elements.push(text("late", 0.0, 0.0, 10.0, 10.0));
        session.load_canvas(record);
        assert!((session.viewport().scale() - 2.0).abs() < f64::EPSILON);
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_image_assets_resolve_through_pump() {
        let storage = MemoryAssetStorage::new();
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        storage.insert("pic", bytes.into_inner()).unwrap();

        let mut session = BoardSession::new(BoardConfig::default(), Arc::new(storage));
        let events = recorder(&mut session);
        let id = session
            .insert_image(AssetRef::new("pic"), Point::new(50.0, 50.0))
            .unwrap();
        assert_eq!(session.pump_assets(), 1);
        assert!(session.assets().handle(&id).is_some());
        assert!(events.borrow().contains(&BoardEvent::AssetResolved(id.clone())));
        let el = session.store().get(&id).unwrap();
        assert_eq!(el.center(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_record_roundtrip() {
        let mut session = session_with(vec![text("a", 12.0, 34.0, 100.0, 50.0)]);
        session.on_pointer_down(Point::new(20.0, 40.0), MouseButton::Left);
        session.on_pointer_move(Point::new(25.0, 40.0));
        // Uncommitted drag is not saved until committed
        assert_eq!(session.to_record().elements[0].position, Point::new(12.0, 34.0));
        session.commit_pending();
        assert_eq!(session.to_record().elements[0].position, Point::new(17.0, 34.0));
    }

    #[test]
    fn test_close_drops_listeners() {
        let mut session = session_with(vec![]);
        let events = recorder(&mut session);
        session.close();
        session.on_wheel(Point::new(1.0, 1.0), -1.0);
        assert!(events.borrow().is_empty());
    }
}
