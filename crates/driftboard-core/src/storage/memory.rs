//! In-memory storage implementation.

use super::{BoxFuture, CanvasRecord, CanvasStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    canvases: RwLock<HashMap<String, CanvasRecord>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl CanvasStorage for MemoryStorage {
    fn save(&self, id: &str, canvas: &CanvasRecord) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let canvas = canvas.clone();
        Box::pin(async move {
            let mut canvases = self.canvases.write().map_err(lock_error)?;
            canvases.insert(id, canvas);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<CanvasRecord>> {
        let id = id.to_string();
        Box::pin(async move {
            let canvases = self.canvases.read().map_err(lock_error)?;
            canvases.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut canvases = self.canvases.write().map_err(lock_error)?;
            canvases.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let canvases = self.canvases.read().map_err(lock_error)?;
            Ok(canvases.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let canvases = self.canvases.read().map_err(lock_error)?;
            Ok(canvases.contains_key(&id))
        })
    }
}
