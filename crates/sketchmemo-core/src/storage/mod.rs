//! Storage abstraction for persistence.
//!
//! Two capabilities are consumed by the repository: a [`RecordStore`] holding
//! memo rows, filtered by owner on every access, and a [`BlobStore`] holding
//! preview images by path.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::{MemoryBlobStore, MemoryRecordStore};

#[cfg(not(target_arch = "wasm32"))]
pub use file::{FileBlobStore, FileRecordStore, default_data_dir};

use crate::memo::{MemoId, MemoPatch, MemoRow, OwnerId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::{Component, Path};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Record already exists: {0}")]
    Conflict(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid blob path: {0:?}")]
    InvalidPath(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Row store for memos.
///
/// Every row-level operation carries an equality filter on the owner column:
/// a row owned by someone else behaves exactly like a missing row.
pub trait RecordStore: Send + Sync {
    /// Insert a new row. Fails with [`StorageError::Conflict`] if the id is taken.
    fn insert(&self, row: MemoRow) -> BoxFuture<'_, StorageResult<()>>;

    /// Select the row with `id` owned by `owner`.
    fn select(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>>;

    /// Apply `patch` and stamp `updated_at` on the row with `id` owned by
    /// `owner`, returning the updated row.
    fn update(
        &self,
        id: MemoId,
        owner: OwnerId,
        patch: MemoPatch,
        updated_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StorageResult<Option<MemoRow>>>;

    /// Delete the row with `id` owned by `owner`, returning what was deleted.
    fn delete(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>>;

    /// All rows owned by `owner`, most recently updated first.
    fn list(&self, owner: OwnerId) -> BoxFuture<'_, StorageResult<Vec<MemoRow>>>;
}

/// Path-addressed binary store for preview images.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, replacing anything already there.
    fn upload(&self, path: &str, bytes: Vec<u8>) -> BoxFuture<'_, StorageResult<String>>;

    /// Remove every listed path. Missing paths are not an error.
    fn remove(&self, paths: Vec<String>) -> BoxFuture<'_, StorageResult<()>>;

    /// Check whether a blob exists.
    fn exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>>;

    /// URL a client can fetch the blob from, if the store exposes one.
    fn public_url(&self, path: &str) -> Option<String>;
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn insert(&self, row: MemoRow) -> BoxFuture<'_, StorageResult<()>> {
        (**self).insert(row)
    }

    fn select(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        (**self).select(id, owner)
    }

    fn update(
        &self,
        id: MemoId,
        owner: OwnerId,
        patch: MemoPatch,
        updated_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        (**self).update(id, owner, patch, updated_at)
    }

    fn delete(&self, id: MemoId, owner: OwnerId) -> BoxFuture<'_, StorageResult<Option<MemoRow>>> {
        (**self).delete(id, owner)
    }

    fn list(&self, owner: OwnerId) -> BoxFuture<'_, StorageResult<Vec<MemoRow>>> {
        (**self).list(owner)
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn upload(&self, path: &str, bytes: Vec<u8>) -> BoxFuture<'_, StorageResult<String>> {
        (**self).upload(path, bytes)
    }

    fn remove(&self, paths: Vec<String>) -> BoxFuture<'_, StorageResult<()>> {
        (**self).remove(paths)
    }

    fn exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
        (**self).exists(path)
    }

    fn public_url(&self, path: &str) -> Option<String> {
        (**self).public_url(path)
    }
}

/// Reject blob paths that are empty, absolute or climb out of the store.
pub(crate) fn validate_blob_path(path: &str) -> StorageResult<()> {
    let p = Path::new(path);
    let valid = !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && p.components().all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

/// Join a public base URL and a blob path.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Newest first; ties broken by id so listings are stable.
pub(crate) fn sort_newest_first(rows: &mut [MemoRow]) {
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_blob_path() {
        assert!(validate_blob_path("owner/memo.png").is_ok());
        assert!(validate_blob_path("memo.png").is_ok());
        assert!(validate_blob_path("").is_err());
        assert!(validate_blob_path("/etc/passwd").is_err());
        assert!(validate_blob_path("../escape.png").is_err());
        assert!(validate_blob_path("owner/../../escape.png").is_err());
        assert!(validate_blob_path("./memo.png").is_err());
        assert!(validate_blob_path("owner\\memo.png").is_err());
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://cdn.example/previews/", "a/b.png"), "https://cdn.example/previews/a/b.png");
        assert_eq!(join_url("https://cdn.example", "b.png"), "https://cdn.example/b.png");
    }
}
