//! Driftboard Core Library
//!
//! Platform-agnostic state and interaction logic for an infinite canvas
//! whiteboard: viewport, background grid, element store, selection and
//! transform gestures, and asynchronous image loading.

pub mod assets;
pub mod config;
pub mod element;
pub mod events;
pub mod geometry;
pub mod grid;
pub mod input;
pub mod selection;
pub mod session;
pub mod storage;
pub mod store;
pub mod viewport;

pub use assets::{AssetCache, AssetError, AssetEvent, AssetState, AssetStorage, MemoryAssetStorage, RasterImage};
pub use config::{BoardConfig, ConfigError, ElementConfig, GridConfig, ViewportConfig};
pub use element::{AssetRef, Element, ElementId, ElementKind, ElementStyle, SerializableColor};
pub use events::{BoardEvent, EventDispatcher, SubscriptionId};
pub use geometry::ViewTransform;
pub use grid::{Axis, GridLine, compute_grid};
pub use input::{InputEvent, InputState, Key, MouseButton};
pub use selection::{CommitOutcome, Handle, HandleKind, HitTarget, SelectionController, SelectionMode};
pub use session::BoardSession;
pub use storage::{CanvasRecord, CanvasStorage, MemoryStorage, StorageError};
pub use store::{ElementPatch, ElementStore, StoreError};
pub use viewport::{Viewport, ZoomDirection};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
