//! In-memory storage implementation.

use super::{
    BlobStore, BoxFuture, RecordStore, StorageError, StorageResult, join_url, sort_newest_first,
    validate_blob_path,
};
use crate::memo::{MemoId, MemoPatch, MemoRow, OwnerId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

/// In-memory memo rows for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryRecordStore {
    rows: RwLock<HashMap<MemoId, MemoRow>>,
}

impl MemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows across all owners.
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, row: MemoRow) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut rows = self.rows.write().map_err(lock_error)?;
            if rows.contains_key(&row.id) {
                return Err(StorageError::Conflict(row.id.to_string()));
            }
            rows.insert(row.id, row);
            Ok(())
        })
    }

    fn select(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        Box::pin(async move {
            let rows = self.rows.read().map_err(lock_error)?;
            Ok(rows.get(&id).filter(|row| row.owner_id == owner).cloned())
        })
    }

    fn update(
        &self,
        id: MemoId,
        owner: OwnerId,
        patch: MemoPatch,
        updated_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        Box::pin(async move {
            let mut rows = self.rows.write().map_err(lock_error)?;
            let Some(row) = rows.get_mut(&id).filter(|row| row.owner_id == owner) else {
                return Ok(None);
            };
            patch.apply(row);
            row.updated_at = updated_at;
            Ok(Some(row.clone()))
        })
    }

    fn delete(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        Box::pin(async move {
            let mut rows = self.rows.write().map_err(lock_error)?;
            if rows.get(&id).is_some_and(|row| row.owner_id == owner) {
                Ok(rows.remove(&id))
            } else {
                Ok(None)
            }
        })
    }

    fn list(&self, owner: OwnerId) -> BoxFuture<'_, StorageResult<Vec<MemoRow>>> {
        Box::pin(async move {
            let rows = self.rows.read().map_err(lock_error)?;
            let mut owned: Vec<MemoRow> = rows
                .values()
                .filter(|row| row.owner_id == owner)
                .cloned()
                .collect();
            sort_newest_first(&mut owned);
            Ok(owned)
        })
    }
}

/// In-memory blob storage.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    public_base_url: Option<String>,
}

impl MemoryBlobStore {
    /// Create a new empty store without public URLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose blobs are published under `base_url`.
    pub fn with_public_base_url(base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Copy of the stored bytes, if present.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().ok()?.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, path: &str, bytes: Vec<u8>) -> BoxFuture<'_, StorageResult<String>> {
        let path = path.to_string();
        Box::pin(async move {
            validate_blob_path(&path)?;
            let mut blobs = self.blobs.write().map_err(lock_error)?;
            blobs.insert(path.clone(), bytes);
            Ok(path)
        })
    }

    fn remove(&self, paths: Vec<String>) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut blobs = self.blobs.write().map_err(lock_error)?;
            for path in &paths {
                blobs.remove(path);
            }
            Ok(())
        })
    }

    fn exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = path.to_string();
        Box::pin(async move {
            let blobs = self.blobs.read().map_err(lock_error)?;
            Ok(blobs.contains_key(&path))
        })
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.public_base_url.as_deref().map(|base| join_url(base, path))
    }
}
