//! Storage abstraction for canvas persistence.

mod memory;
mod record;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryStorage;
pub use record::{CanvasRecord, RawCanvas, RawElement};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Canvas not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Trait for canvas storage backends.
///
/// Backends deal in already normalized [`CanvasRecord`]s; any wire-format
/// translation happens in [`CanvasRecord::from_json`].
pub trait CanvasStorage: Send + Sync {
    /// Save a canvas.
    fn save(&self, id: &str, canvas: &CanvasRecord) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a canvas.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<CanvasRecord>>;

    /// Delete a canvas.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all canvas IDs.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a canvas exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    // Storage futures never wait on anything, so spinning is enough
    use futures_util::task::noop_waker_ref;
    use std::task::{Context, Poll};

    let mut cx = Context::from_waker(noop_waker_ref());
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}
