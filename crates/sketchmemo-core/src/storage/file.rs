//! File-based storage implementation for native platforms.

use super::{
    BlobStore, BoxFuture, RecordStore, StorageError, StorageResult, join_url, sort_newest_first,
    validate_blob_path,
};
use crate::memo::{MemoId, MemoPatch, MemoRow, OwnerId};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default data directory.
///
/// On Unix: `~/.local/share/sketchmemo/`
/// On Windows: `%LOCALAPPDATA%\sketchmemo\`
pub fn default_data_dir() -> StorageResult<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
    Ok(base.join("sketchmemo"))
}

fn ensure_dir(path: &Path) -> StorageResult<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            StorageError::Io(format!("Failed to create directory {}: {}", path.display(), e))
        })?;
    }
    Ok(())
}

/// Memo rows stored as one JSON file each.
pub struct FileRecordStore {
    /// Directory holding `<id>.json` files.
    base_path: PathBuf,
}

impl FileRecordStore {
    /// Create a record store in `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        ensure_dir(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn row_path(&self, id: MemoId) -> PathBuf {
        // Uuid text is always filename-safe.
        self.base_path.join(format!("{}.json", id))
    }

    fn read_row(path: &Path) -> StorageResult<Option<MemoRow>> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Io(format!("Failed to read {}: {}", path.display(), e)));
            }
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn write_row(path: &Path, row: &MemoRow) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(row)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        // Write-then-rename keeps a row intact if the process dies mid-write.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, path))
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn read_owned(&self, id: MemoId, owner: OwnerId) -> StorageResult<Option<(PathBuf, MemoRow)>> {
        let path = self.row_path(id);
        Ok(Self::read_row(&path)?
            .filter(|row| row.owner_id == owner)
            .map(|row| (path, row)))
    }
}

impl RecordStore for FileRecordStore {
    fn insert(&self, row: MemoRow) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let path = self.row_path(row.id);
            if path.exists() {
                return Err(StorageError::Conflict(row.id.to_string()));
            }
            Self::write_row(&path, &row)
        })
    }

    fn select(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        Box::pin(async move { Ok(self.read_owned(id, owner)?.map(|(_, row)| row)) })
    }

    fn update(
        &self,
        id: MemoId,
        owner: OwnerId,
        patch: MemoPatch,
        updated_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        Box::pin(async move {
            let Some((path, mut row)) = self.read_owned(id, owner)? else {
                return Ok(None);
            };
            patch.apply(&mut row);
            row.updated_at = updated_at;
            Self::write_row(&path, &row)?;
            Ok(Some(row))
        })
    }

    fn delete(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        Box::pin(async move {
            let Some((path, row)) = self.read_owned(id, owner)? else {
                return Ok(None);
            };
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
            Ok(Some(row))
        })
    }

    fn list(&self, owner: OwnerId) -> BoxFuture<'_, StorageResult<Vec<MemoRow>>> {
        Box::pin(async move {
            let entries = fs::read_dir(&self.base_path)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut rows = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                // Only include .json files
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                match Self::read_row(&path) {
                    Ok(Some(row)) if row.owner_id == owner => rows.push(row),
                    Ok(_) => {}
                    Err(e) => log::warn!("Skipping unreadable record: {}", e),
                }
            }
            sort_newest_first(&mut rows);
            Ok(rows)
        })
    }
}

/// Blobs stored as plain files under a base directory.
pub struct FileBlobStore {
    base_path: PathBuf,
    public_base_url: Option<String>,
}

impl FileBlobStore {
    /// Create a blob store in `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        ensure_dir(&base_path)?;
        Ok(Self {
            base_path,
            public_base_url: None,
        })
    }

    /// Publish blobs under `base_url` instead of `file://` URLs.
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = Some(base_url.into());
        self
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, path: &str) -> StorageResult<PathBuf> {
        validate_blob_path(path)?;
        Ok(self.base_path.join(path))
    }
}

impl BlobStore for FileBlobStore {
    fn upload(&self, path: &str, bytes: Vec<u8>) -> BoxFuture<'_, StorageResult<String>> {
        let path = path.to_string();
        Box::pin(async move {
            let file = self.blob_path(&path)?;
            if let Some(parent) = file.parent() {
                ensure_dir(parent)?;
            }
            fs::write(&file, bytes).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", file.display(), e))
            })?;
            Ok(path)
        })
    }

    fn remove(&self, paths: Vec<String>) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            for path in &paths {
                let file = self.blob_path(path)?;
                match fs::remove_file(&file) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(StorageError::Io(format!(
                            "Failed to delete {}: {}",
                            file.display(),
                            e
                        )));
                    }
                }
            }
            Ok(())
        })
    }

    fn exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = path.to_string();
        Box::pin(async move { Ok(self.blob_path(&path)?.is_file()) })
    }

    fn public_url(&self, path: &str) -> Option<String> {
        if validate_blob_path(path).is_err() {
            return None;
        }
        match &self.public_base_url {
            Some(base) => Some(join_url(base, path)),
            None => Some(format!("file://{}", self.base_path.join(path).display())),
        }
    }
}
