//! Owner-scoped memo persistence.
//!
//! Every operation takes the owner explicitly. A memo that exists but belongs
//! to someone else is reported exactly like a memo that does not exist.

use crate::drawing::{Drawing, DrawingData};
use crate::memo::{Memo, MemoId, MemoPatch, MemoRow, MemoSummary, NewMemo, OwnerId};
use crate::storage::{BlobStore, RecordStore, StorageError};
use chrono::Utc;
use thiserror::Error;

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Memo not found: {0}")]
    NotFound(MemoId),
    #[error("Drawing for memo {id} is unreadable: {source}")]
    CorruptDrawing {
        id: MemoId,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Blob path of a memo's preview image.
pub fn preview_path(owner: OwnerId, memo_id: MemoId) -> String {
    format!("{}/{}.png", owner, memo_id)
}

/// Memo records plus their preview blobs.
pub struct MemoRepository<R, B> {
    records: R,
    blobs: B,
}

impl<R: RecordStore, B: BlobStore> MemoRepository<R, B> {
    pub fn new(records: R, blobs: B) -> Self {
        Self { records, blobs }
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Load a memo the owner is allowed to see.
    pub async fn load_owned(&self, id: MemoId, owner: OwnerId) -> Result<Memo, RepositoryError> {
        let row = self
            .records
            .select(id, owner)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        into_memo(row)
    }

    /// Preview path currently stored on a memo the owner can see.
    pub async fn stored_preview_path(&self, id: MemoId, owner: OwnerId) -> Result<Option<String>, RepositoryError> {
        let row = self
            .records
            .select(id, owner)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        Ok(row.preview_image_path)
    }

    /// Insert a new memo under `owner`.
    ///
    /// The drawing is checked before anything is written.
    pub async fn create(&self, owner: OwnerId, memo: NewMemo) -> Result<Memo, RepositoryError> {
        let drawing = parse_drawing(memo.id, &memo.drawing)?;
        let row = MemoRow {
            id: memo.id,
            owner_id: owner,
            title: memo.title,
            drawing_data: memo.drawing,
            preview_image_path: memo.preview_image_path,
            updated_at: Utc::now(),
        };
        self.records.insert(row.clone()).await?;
        log::info!("Created memo {} for {}", row.id, owner);
        Ok(assemble(row, drawing))
    }

    /// Create a blank memo with only a title.
    pub async fn create_from_title(
        &self,
        owner: OwnerId,
        title: impl Into<String>,
    ) -> Result<Memo, RepositoryError> {
        self.create(owner, NewMemo::new(title, DrawingData::blank())).await
    }

    /// Apply a partial update; fields absent from `patch` are preserved.
    ///
    /// A new drawing is checked before anything is written.
    pub async fn update(
        &self,
        id: MemoId,
        owner: OwnerId,
        patch: MemoPatch,
    ) -> Result<Memo, RepositoryError> {
        let drawing = patch
            .drawing
            .as_ref()
            .map(|data| parse_drawing(id, data))
            .transpose()?;
        let row = self
            .records
            .update(id, owner, patch, Utc::now())
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        log::info!("Updated memo {}", id);
        match drawing {
            Some(drawing) => Ok(assemble(row, drawing)),
            None => into_memo(row),
        }
    }

    /// Delete a memo, then its preview image if it had one.
    ///
    /// Blob removal is best-effort: a failure is logged and the record stays
    /// deleted.
    pub async fn delete(&self, id: MemoId, owner: OwnerId) -> Result<(), RepositoryError> {
        let row = self
            .records
            .delete(id, owner)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        log::info!("Deleted memo {}", id);

        if let Some(path) = row.preview_image_path {
            if let Err(e) = self.blobs.remove(vec![path.clone()]).await {
                log::warn!("Failed to remove preview {} of deleted memo {}: {}", path, id, e);
            }
        }
        Ok(())
    }

    /// Store PNG bytes as the preview of `memo_id`, replacing any previous one.
    pub async fn upload_preview(
        &self,
        owner: OwnerId,
        memo_id: MemoId,
        bytes: Vec<u8>,
    ) -> Result<String, RepositoryError> {
        let path = preview_path(owner, memo_id);
        Ok(self.blobs.upload(&path, bytes).await?)
    }

    /// Remove a preview no record refers to. Failures are only logged.
    pub async fn discard_preview(&self, path: &str) {
        match self.blobs.remove(vec![path.to_string()]).await {
            Ok(()) => log::debug!("Discarded unreferenced preview {}", path),
            Err(e) => log::warn!("Failed to discard unreferenced preview {}: {}", path, e),
        }
    }

    /// The owner's memos, most recently updated first.
    pub async fn list_owned(&self, owner: OwnerId) -> Result<Vec<MemoSummary>, RepositoryError> {
        let rows = self.records.list(owner).await?;
        Ok(rows
            .into_iter()
            .map(|row| MemoSummary {
                preview_url: row
                    .preview_image_path
                    .as_deref()
                    .and_then(|path| self.blobs.public_url(path)),
                id: row.id,
                title: row.title,
                updated_at: row.updated_at,
                preview_image_path: row.preview_image_path,
            })
            .collect())
    }
}

fn parse_drawing(id: MemoId, data: &DrawingData) -> Result<Drawing, RepositoryError> {
    Drawing::from_data(data).map_err(|source| RepositoryError::CorruptDrawing { id, source })
}

fn into_memo(row: MemoRow) -> Result<Memo, RepositoryError> {
    let drawing = parse_drawing(row.id, &row.drawing_data)?;
    Ok(assemble(row, drawing))
}

fn assemble(row: MemoRow, drawing: Drawing) -> Memo {
    Memo {
        id: row.id,
        owner_id: row.owner_id,
        title: row.title,
        drawing,
        preview_image_path: row.preview_image_path,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobStore, MemoryRecordStore};
    use pollster::block_on;
    use serde_json::json;

    fn repo() -> MemoRepository<MemoryRecordStore, MemoryBlobStore> {
        MemoRepository::new(
            MemoryRecordStore::new(),
            MemoryBlobStore::with_public_base_url("https://cdn.example/memo-previews"),
        )
    }

    #[test]
    fn test_preview_path() {
        let owner = OwnerId::new();
        let memo = MemoId::new();
        assert_eq!(preview_path(owner, memo), format!("{owner}/{memo}.png"));
    }

    #[test]
    fn test_update_stamps_time_and_keeps_fields() {
        let repo = repo();
        let owner = OwnerId::new();
        let created = block_on(repo.create(
            owner,
            NewMemo::new("first", DrawingData::blank()).with_preview("p.png"),
        ))
        .unwrap();

        let patch = MemoPatch {
            title: Some("second".to_string()),
            ..Default::default()
        };
        let updated = block_on(repo.update(created.id, owner, patch)).unwrap();
        assert_eq!(updated.title, "second");
        assert_eq!(updated.preview_image_path.as_deref(), Some("p.png"));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_foreign_update_and_delete_are_not_found() {
        let repo = repo();
        let owner = OwnerId::new();
        let memo = block_on(repo.create_from_title(owner, "mine")).unwrap();
        let other = OwnerId::new();

        assert!(matches!(
            block_on(repo.update(memo.id, other, MemoPatch::default())),
            Err(RepositoryError::NotFound(id)) if id == memo.id
        ));
        assert!(matches!(
            block_on(repo.delete(memo.id, other)),
            Err(RepositoryError::NotFound(_))
        ));
        assert_eq!(block_on(repo.load_owned(memo.id, owner)).unwrap().title, "mine");
    }

    #[test]
    fn test_corrupt_drawing() {
        let repo = repo();
        let owner = OwnerId::new();
        let id = MemoId::new();
        let row = MemoRow {
            id,
            owner_id: owner,
            title: "broken".to_string(),
            drawing_data: DrawingData::from(json!({"strokes": [{"points": [1.0]}]})),
            preview_image_path: None,
            updated_at: Utc::now(),
        };
        block_on(repo.records().insert(row)).unwrap();

        assert!(matches!(
            block_on(repo.load_owned(id, owner)),
            Err(RepositoryError::CorruptDrawing { id: bad, .. }) if bad == id
        ));
    }

    #[test]
    fn test_invalid_drawing_is_never_written() {
        let repo = repo();
        let owner = OwnerId::new();
        let broken = || DrawingData::from(json!({"strokes": [{"points": [1.0]}]}));

        let new = NewMemo::new("x", broken());
        let id = new.id;
        assert!(matches!(
            block_on(repo.create(owner, new)),
            Err(RepositoryError::CorruptDrawing { .. })
        ));
        assert!(block_on(repo.records().select(id, owner)).unwrap().is_none());

        let memo = block_on(repo.create_from_title(owner, "kept")).unwrap();
        let patch = MemoPatch {
            title: Some("changed".to_string()),
            drawing: Some(broken()),
            ..Default::default()
        };
        assert!(matches!(
            block_on(repo.update(memo.id, owner, patch)),
            Err(RepositoryError::CorruptDrawing { .. })
        ));
        let stored = block_on(repo.load_owned(memo.id, owner)).unwrap();
        assert_eq!(stored.title, "kept");
        assert_eq!(stored.updated_at, memo.updated_at);
    }

    #[test]
    fn test_stored_preview_path() {
        let repo = repo();
        let owner = OwnerId::new();
        let memo = block_on(repo.create(
            owner,
            NewMemo::new("p", DrawingData::blank()).with_preview("a/b.png"),
        ))
        .unwrap();
        assert_eq!(
            block_on(repo.stored_preview_path(memo.id, owner)).unwrap().as_deref(),
            Some("a/b.png")
        );
        assert!(matches!(
            block_on(repo.stored_preview_path(memo.id, OwnerId::new())),
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_resolves_preview_urls() {
        let repo = repo();
        let owner = OwnerId::new();
        let plain = block_on(repo.create_from_title(owner, "plain")).unwrap();
        let new = NewMemo::new("pictured", DrawingData::blank());
        let path = block_on(repo.upload_preview(owner, new.id, vec![1])).unwrap();
        let pictured = block_on(repo.create(owner, new.with_preview(path.clone()))).unwrap();

        let list = block_on(repo.list_owned(owner)).unwrap();
        assert_eq!(list.len(), 2);
        let find = |id| list.iter().find(|s| s.id == id).unwrap();
        assert_eq!(find(plain.id).preview_url, None);
        assert_eq!(
            find(pictured.id).preview_url.as_deref(),
            Some(format!("https://cdn.example/memo-previews/{path}").as_str())
        );
        assert!(block_on(repo.list_owned(OwnerId::new())).unwrap().is_empty());
    }
}
