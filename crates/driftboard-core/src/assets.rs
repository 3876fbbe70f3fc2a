//! Asynchronous raster loading keyed by element id.
//!
//! Loads are issued as boxed futures and polled cooperatively from the
//! interaction loop via [`AssetCache::pump`]. A result whose element has been
//! forgotten in the meantime is dropped on arrival.

use crate::element::{AssetRef, Element, ElementId};
use crate::storage::BoxFuture;
use futures_util::FutureExt;
use futures_util::task::noop_waker_ref;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use uuid::Uuid;

/// Asset errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Asset error: {0}")]
    Other(String),
}

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Binary asset backend.
pub trait AssetStorage: Send + Sync {
    /// Store bytes and return the key they can be fetched with.
    fn upload(&self, bytes: Vec<u8>) -> BoxFuture<'static, AssetResult<AssetRef>>;

    /// Fetch the bytes behind a key.
    fn fetch(&self, asset: &AssetRef) -> BoxFuture<'static, AssetResult<Vec<u8>>>;

    /// Delete an asset. Deleting an unknown key is not an error.
    fn delete(&self, asset: &AssetRef) -> BoxFuture<'static, AssetResult<()>>;
}

/// In-memory asset storage for testing and ephemeral use.
#[derive(Default, Clone)]
pub struct MemoryAssetStorage {
    blobs: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
}

impl MemoryAssetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes under a fixed key.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) -> AssetResult<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
        blobs.insert(key.into(), Arc::new(bytes));
        Ok(())
    }

    pub fn contains(&self, asset: &AssetRef) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(asset.as_str()))
            .unwrap_or(false)
    }
}

impl AssetStorage for MemoryAssetStorage {
    fn upload(&self, bytes: Vec<u8>) -> BoxFuture<'static, AssetResult<AssetRef>> {
        let blobs = Arc::clone(&self.blobs);
        Box::pin(async move {
            let key = Uuid::new_v4().to_string();
            let mut blobs = blobs
                .write()
                .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
            blobs.insert(key.clone(), Arc::new(bytes));
            Ok(AssetRef::new(key))
        })
    }

    fn fetch(&self, asset: &AssetRef) -> BoxFuture<'static, AssetResult<Vec<u8>>> {
        let blobs = Arc::clone(&self.blobs);
        let key = asset.as_str().to_string();
        Box::pin(async move {
            let blobs = blobs
                .read()
                .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
            blobs
                .get(&key)
                .map(|bytes| bytes.as_ref().clone())
                .ok_or(AssetError::NotFound(key))
        })
    }

    fn delete(&self, asset: &AssetRef) -> BoxFuture<'static, AssetResult<()>> {
        let blobs = Arc::clone(&self.blobs);
        let key = asset.as_str().to_string();
        Box::pin(async move {
            let mut blobs = blobs
                .write()
                .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
            blobs.remove(&key);
            Ok(())
        })
    }
}

/// Decoded RGBA8 pixels. Cloning shares the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Decode any supported format into RGBA8.
    pub fn decode(bytes: &[u8]) -> AssetResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| AssetError::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: Arc::new(rgba.into_raw()),
        })
    }
}

/// Load state of a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    Pending,
    Loaded(RasterImage),
    Failed(AssetError),
}

/// Completion reported by [`AssetCache::pump`].
#[derive(Debug, Clone, PartialEq)]
pub enum AssetEvent {
    Resolved(ElementId),
    Failed { id: ElementId, error: AssetError },
    DeleteFailed { asset: AssetRef, error: AssetError },
}

type LoadFuture = BoxFuture<'static, AssetResult<Vec<u8>>>;
type DeleteFuture = BoxFuture<'static, AssetResult<()>>;

/// Cached state for one element, tagged with the asset it was loaded from.
#[derive(Debug, Clone)]
struct AssetEntry {
    asset: AssetRef,
    state: AssetState,
}

/// Element id to raster handle map with deduplicated loads.
pub struct AssetCache {
    storage: Arc<dyn AssetStorage>,
    entries: HashMap<ElementId, AssetEntry>,
    loads: Vec<(ElementId, AssetRef, LoadFuture)>,
    deletes: Vec<(AssetRef, DeleteFuture)>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("entries", &self.entries.len())
            .field("loads", &self.loads.len())
            .field("deletes", &self.deletes.len())
            .finish()
    }
}

impl AssetCache {
    pub fn new(storage: Arc<dyn AssetStorage>) -> Self {
        Self {
            storage,
            entries: HashMap::new(),
            loads: Vec::new(),
            deletes: Vec::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn AssetStorage> {
        &self.storage
    }

    /// Start loading the element's asset unless an entry for the same asset
    /// already exists. An entry for a different asset is replaced.
    pub fn request(&mut self, element: &Element) -> bool {
        let Some(asset) = element.image_ref.as_ref().filter(|_| element.needs_asset()) else {
            return false;
        };
        if let Some(entry) = self.entries.get(&element.id) {
            if entry.asset == *asset {
                return false;
            }
            log::debug!("asset for {} changed from {} to {}", element.id, entry.asset, asset);
        }
        log::debug!("loading asset {} for {}", asset, element.id);
        self.entries.insert(
            element.id.clone(),
            AssetEntry {
                asset: asset.clone(),
                state: AssetState::Pending,
            },
        );
        self.loads
            .push((element.id.clone(), asset.clone(), self.storage.fetch(asset)));
        true
    }

    /// Request every image element and forget entries whose element is gone.
    pub fn sync<'a>(&mut self, elements: impl IntoIterator<Item = &'a Element>) {
        let mut live = HashSet::new();
        for element in elements {
            if element.needs_asset() {
                live.insert(element.id.clone());
                self.request(element);
            }
        }
        self.entries.retain(|id, _| live.contains(id));
    }

    pub fn get(&self, id: &ElementId) -> Option<&AssetState> {
        self.entries.get(id).map(|entry| &entry.state)
    }

    /// The decoded raster for an element, if it has finished loading.
    pub fn handle(&self, id: &ElementId) -> Option<&RasterImage> {
        match self.get(id) {
            Some(AssetState::Loaded(raster)) => Some(raster),
            _ => None,
        }
    }

    /// Drop the entry for an element. An in-flight load is discarded when it
    /// completes.
    pub fn forget(&mut self, id: &ElementId) {
        self.entries.remove(id);
    }

    /// Queue a best-effort delete of a stored asset.
    pub fn release(&mut self, asset: AssetRef) {
        let future = self.storage.delete(&asset);
        self.deletes.push((asset, future));
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    pub fn pending_deletes(&self) -> usize {
        self.deletes.len()
    }

    /// Whether no load or delete is outstanding.
    pub fn is_idle(&self) -> bool {
        self.loads.is_empty() && self.deletes.is_empty()
    }

    /// Poll outstanding work once without blocking and merge what finished.
    pub fn pump(&mut self) -> Vec<AssetEvent> {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut events = Vec::new();

        let mut still_loading = Vec::with_capacity(self.loads.len());
        for (id, asset, mut future) in std::mem::take(&mut self.loads) {
            match future.poll_unpin(&mut cx) {
                Poll::Pending => still_loading.push((id, asset, future)),
                Poll::Ready(result) => {
                    if let Some(event) = self.merge(id, &asset, result) {
                        events.push(event);
                    }
                }
            }
        }
        self.loads = still_loading;

        let mut still_deleting = Vec::with_capacity(self.deletes.len());
        for (asset, mut future) in std::mem::take(&mut self.deletes) {
            match future.poll_unpin(&mut cx) {
                Poll::Pending => still_deleting.push((asset, future)),
                Poll::Ready(Ok(())) => log::debug!("deleted asset {}", asset),
                Poll::Ready(Err(error)) => {
                    log::warn!("failed to delete asset {}: {}", asset, error);
                    events.push(AssetEvent::DeleteFailed { asset, error });
                }
            }
        }
        self.deletes = still_deleting;

        events
    }

    fn merge(
        &mut self,
        id: ElementId,
        asset: &AssetRef,
        result: AssetResult<Vec<u8>>,
    ) -> Option<AssetEvent> {
        let Some(entry) = self.entries.get_mut(&id).filter(|e| e.asset == *asset) else {
            log::debug!("discarding stale asset load {} for {}", asset, id);
            return None;
        };
        match result.and_then(|bytes| RasterImage::decode(&bytes)) {
            Ok(raster) => {
                log::debug!("asset for {} loaded ({}x{})", id, raster.width, raster.height);
                entry.state = AssetState::Loaded(raster);
                Some(AssetEvent::Resolved(id))
            }
            Err(error) => {
                log::warn!("asset for {} failed: {}", id, error);
                entry.state = AssetState::Failed(error.clone());
                Some(AssetEvent::Failed { id, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Size};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn image_element(id: &str, key: &str) -> Element {
        Element::image(ElementId::new(id), AssetRef::new(key), Point::ZERO, Size::new(10.0, 10.0))
    }

    struct FailingDeletes;

    impl AssetStorage for FailingDeletes {
        fn upload(&self, _bytes: Vec<u8>) -> BoxFuture<'static, AssetResult<AssetRef>> {
            Box::pin(async { Err(AssetError::Other("read only".to_string())) })
        }

        fn fetch(&self, asset: &AssetRef) -> BoxFuture<'static, AssetResult<Vec<u8>>> {
            let key = asset.as_str().to_string();
            Box::pin(async move { Err(AssetError::NotFound(key)) })
        }

        fn delete(&self, _asset: &AssetRef) -> BoxFuture<'static, AssetResult<()>> {
            Box::pin(async { Err(AssetError::Io("offline".to_string())) })
        }
    }

    #[test]
    fn test_load_and_resolve() {
        let storage = MemoryAssetStorage::new();
        storage.insert("pic", png_bytes(3, 2)).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage));
        let el = image_element("a", "pic");

        assert!(cache.request(&el));
        assert_eq!(cache.get(&el.id), Some(&AssetState::Pending));
        let events = cache.pump();
        assert_eq!(events, vec![AssetEvent::Resolved(el.id.clone())]);
        let raster = cache.handle(&el.id).unwrap();
        assert_eq!((raster.width, raster.height), (3, 2));
        assert_eq!(raster.pixels.len(), 3 * 2 * 4);
        assert!(cache.is_idle());
    }

    #[test]
    fn test_requests_are_deduplicated() {
        let storage = MemoryAssetStorage::new();
        storage.insert("pic", png_bytes(1, 1)).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage));
        let el = image_element("a", "pic");
        assert!(cache.request(&el));
        assert!(!cache.request(&el));
        assert_eq!(cache.pending_loads(), 1);
        cache.pump();
        assert!(!cache.request(&el));
    }

    #[test]
    fn test_text_elements_are_ignored() {
        let mut cache = AssetCache::new(Arc::new(MemoryAssetStorage::new()));
        let el = Element::text(ElementId::new("t"), "hi", Point::ZERO, Size::new(1.0, 1.0));
        assert!(!cache.request(&el));
        assert!(cache.get(&el.id).is_none());
    }

    #[test]
    fn test_missing_and_corrupt_assets_fail() {
        let storage = MemoryAssetStorage::new();
        storage.insert("junk", vec![1, 2, 3]).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage));
        let missing = image_element("m", "nope");
        let corrupt = image_element("c", "junk");
        cache.request(&missing);
        cache.request(&corrupt);
        let events = cache.pump();
        assert_eq!(events.len(), 2);
        assert!(matches!(cache.get(&missing.id), Some(AssetState::Failed(AssetError::NotFound(_)))));
        assert!(matches!(cache.get(&corrupt.id), Some(AssetState::Failed(AssetError::Decode(_)))));
    }

    #[test]
    fn test_late_result_for_forgotten_element_is_dropped() {
        let storage = MemoryAssetStorage::new();
        storage.insert("pic", png_bytes(1, 1)).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage));
        let el = image_element("a", "pic");
        cache.request(&el);
        cache.forget(&el.id);
        assert!(cache.pump().is_empty());
        assert!(cache.get(&el.id).is_none());
        assert!(cache.is_idle());
    }

    #[test]
    fn test_sync_drops_removed_elements() {
        let storage = MemoryAssetStorage::new();
        storage.insert("pic", png_bytes(1, 1)).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage));
        let a = image_element("a", "pic");
        let b = image_element("b", "pic");
        cache.sync([&a, &b]);
        cache.pump();
        cache.sync([&b]);
        assert!(cache.get(&a.id).is_none());
        assert!(cache.handle(&b.id).is_some());
    }

    #[test]
    fn test_changed_image_ref_is_reloaded() {
        let storage = MemoryAssetStorage::new();
        storage.insert("small", png_bytes(1, 1)).unwrap();
        storage.insert("big", png_bytes(4, 3)).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage));
        cache.sync([&image_element("a", "small")]);
        cache.pump();
        assert_eq!(cache.handle(&ElementId::new("a")).unwrap().width, 1);

        let swapped = image_element("a", "big");
        cache.sync([&swapped]);
        assert_eq!(cache.get(&swapped.id), Some(&AssetState::Pending));
        assert_eq!(cache.pump(), vec![AssetEvent::Resolved(swapped.id.clone())]);
        let raster = cache.handle(&swapped.id).unwrap();
        assert_eq!((raster.width, raster.height), (4, 3));
    }

    #[test]
    fn test_load_for_replaced_ref_is_dropped() {
        let storage = MemoryAssetStorage::new();
        storage.insert("old", png_bytes(1, 1)).unwrap();
        storage.insert("new", png_bytes(2, 2)).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage));
        cache.request(&image_element("a", "old"));
        cache.request(&image_element("a", "new"));
        assert_eq!(cache.pending_loads(), 2);
        let events = cache.pump();
        assert_eq!(events, vec![AssetEvent::Resolved(ElementId::new("a"))]);
        assert_eq!(cache.handle(&ElementId::new("a")).unwrap().width, 2);
    }

    #[test]
    fn test_release_deletes_blob() {
        let storage = MemoryAssetStorage::new();
        storage.insert("pic", png_bytes(1, 1)).unwrap();
        let mut cache = AssetCache::new(Arc::new(storage.clone()));
        cache.release(AssetRef::new("pic"));
        assert_eq!(cache.pending_deletes(), 1);
        assert!(cache.pump().is_empty());
        assert!(!storage.contains(&AssetRef::new("pic")));
    }

    #[test]
    fn test_failed_delete_is_reported() {
        let mut cache = AssetCache::new(Arc::new(FailingDeletes));
        cache.release(AssetRef::new("pic"));
        let events = cache.pump();
        assert_eq!(
            events,
            vec![AssetEvent::DeleteFailed {
                asset: AssetRef::new("pic"),
                error: AssetError::Io("offline".to_string()),
            }]
        );
        assert!(cache.is_idle());
    }

    #[test]
    fn test_upload_then_fetch() {
        let storage = MemoryAssetStorage::new();
        let asset = futures_util::FutureExt::now_or_never(storage.upload(vec![7, 7]))
            .unwrap()
            .unwrap();
        assert!(storage.contains(&asset));
        let bytes = futures_util::FutureExt::now_or_never(storage.fetch(&asset))
            .unwrap()
            .unwrap();
        assert_eq!(bytes, vec![7, 7]);
    }
}
