//! Board notifications and the dispatcher that delivers them.
//!
//! The dispatcher is owned by a session; listeners live exactly as long as
//! their subscription.

use crate::element::{AssetRef, ElementId};
use crate::geometry::ViewTransform;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Something observable changed on the board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    ViewportChanged(ViewTransform),
    SelectionChanged(Option<ElementId>),
    /// A gesture result was written to the store.
    ElementCommitted(ElementId),
    /// A resize fell below the minimum size and was dropped.
    ResizeRejected(ElementId),
    ElementRemoved(ElementId),
    AssetResolved(ElementId),
    AssetFailed { id: ElementId, message: String },
    AssetDeleteFailed { asset: AssetRef, message: String },
}

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Listener = Box<dyn FnMut(&BoardEvent)>;

/// Synchronous fan-out of [`BoardEvent`]s to subscribed listeners.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: HashMap<SubscriptionId, Listener>,
    /// Subscription order, used for delivery.
    order: Vec<SubscriptionId>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners are called in subscription order.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&BoardEvent) + 'static,
    {
        let id = SubscriptionId::new();
        self.listeners.insert(id, Box::new(listener));
        self.order.push(id);
        log::debug!("subscribed listener {}", id);
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.order.retain(|o| *o != id);
        self.listeners.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&mut self, event: &BoardEvent) {
        for id in &self.order {
            if let Some(listener) = self.listeners.get_mut(id) {
                listener(event);
            }
        }
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.order.clear();
    }
}
