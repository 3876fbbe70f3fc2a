//! File-based storage implementation for native platforms.

use super::{BoxFuture, CanvasRecord, CanvasStorage, StorageError, StorageResult};
use crate::config::ElementConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each canvas as a JSON file in a directory.
pub struct FileStorage {
    base_path: PathBuf,
    /// Sizes given to elements stored without one.
    defaults: ElementConfig,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            defaults: ElementConfig::default(),
        })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/driftboard/canvases/`
    /// On Windows: `%LOCALAPPDATA%\driftboard\canvases\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("driftboard").join("canvases"))
    }

    pub fn with_defaults(mut self, defaults: ElementConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn canvas_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }
}

impl CanvasStorage for FileStorage {
    fn save(&self, id: &str, canvas: &CanvasRecord) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.canvas_path(id);
        let json = canvas.to_json();

        Box::pin(async move {
            let json = json?;
            fs::write(&path, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;
            log::info!("saved canvas to {}", path.display());
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<CanvasRecord>> {
        let path = self.canvas_path(id);
        let id_owned = id.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id_owned));
            }

            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;

            let mut canvas = CanvasRecord::from_json_with(&json, &self.defaults).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            if canvas.id.is_empty() {
                canvas.id = id_owned;
            }
            log::info!(
                "loaded canvas {} with {} elements",
                canvas.id,
                canvas.elements.len()
            );
            Ok(canvas)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.canvas_path(id);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }

            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let ids = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|e| e == "json"))
                .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
                .collect();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.canvas_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}

#[cfg(test)]
mod tests {
    use super::super::block_on;
    use super::*;
    use crate::element::{Element, ElementId};
    use crate::geometry::{Point, Size};
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let mut canvas = CanvasRecord::new("test-canvas");
        canvas.scale = 1.5;
        canvas.elements.push(Element::text(
            ElementId::new("a"),
            "note",
            Point::new(12.0, 34.0),
            Size::new(80.0, 20.0),
        ));

        block_on(storage.save("test-canvas", &canvas)).unwrap();
        let loaded = block_on(storage.load("test-canvas")).unwrap();

        assert_eq!(loaded, canvas);
    }

    #[test]
    fn test_file_storage_normalizes_foreign_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        fs::write(
            dir.path().join("legacy.json"),
            r#"{"elements":[{"id":"a","X":4,"Y":5,"src":"blob"}]}"#,
        )
        .unwrap();

        let loaded = block_on(storage.load("legacy")).unwrap();
        assert_eq!(loaded.id, "legacy");
        assert_eq!(loaded.elements[0].position, Point::new(4.0, 5.0));
        assert_eq!(loaded.elements[0].size, Size::new(100.0, 100.0));
        assert!(loaded.elements[0].needs_asset());
    }

    #[test]
    fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_list_and_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let canvas = CanvasRecord::default();
        block_on(storage.save("one", &canvas)).unwrap();
        block_on(storage.save("two", &canvas)).unwrap();

        let list = block_on(storage.list()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"one".to_string()));

        block_on(storage.delete("one")).unwrap();
        assert!(!block_on(storage.exists("one")).unwrap());
        assert_eq!(block_on(storage.list()).unwrap(), vec!["two".to_string()]);
    }

    #[test]
    fn test_unsafe_ids_are_sanitized() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        block_on(storage.save("../escape", &CanvasRecord::default())).unwrap();
        assert!(dir.path().join("___escape.json").exists());
    }
}
