//! Save and delete orchestration for an editing session.
//!
//! Resolves the caller, serializes the drawing, stores the preview and then
//! writes the record. Only one write runs at a time per coordinator.

use crate::drawing::Drawing;
use crate::identity::IdentityProvider;
use crate::memo::{Memo, MemoId, MemoPatch, NewMemo};
use crate::repository::{MemoRepository, RepositoryError};
use crate::storage::{BlobStore, RecordStore};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Save errors.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Not logged in")]
    Unauthenticated,
    #[error("Memo not found: {0}")]
    NotFound(MemoId),
    #[error("Another save is in progress")]
    Busy,
    #[error("Failed to serialize drawing: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage failure: {0}")]
    Storage(#[source] RepositoryError),
}

impl From<RepositoryError> for SaveError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(id) => SaveError::NotFound(id),
            other => SaveError::Storage(other),
        }
    }
}

/// Error decoding a preview data URL.
#[derive(Debug, Error)]
pub enum PreviewDecodeError {
    #[error("Not a base64 data URL")]
    NotDataUrl,
    #[error("Unsupported preview type: {0}")]
    UnsupportedType(String),
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// PNG bytes of a rendered preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    bytes: Vec<u8>,
}

impl PreviewImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decode a `data:image/png;base64,...` URL as produced by canvas exports.
    pub fn from_data_url(url: &str) -> Result<Self, PreviewDecodeError> {
        use base64::{Engine, engine::general_purpose::STANDARD};

        let rest = url.strip_prefix("data:").ok_or(PreviewDecodeError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(PreviewDecodeError::NotDataUrl)?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or(PreviewDecodeError::NotDataUrl)?;
        if !media_type.eq_ignore_ascii_case("image/png") {
            return Err(PreviewDecodeError::UnsupportedType(media_type.to_string()));
        }
        Ok(Self {
            bytes: STANDARD.decode(payload.trim())?,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// One save of the editor's current state.
#[derive(Debug, Clone)]
pub struct SaveRequest<'a> {
    /// Existing memo to update; `None` creates a new memo.
    pub memo_id: Option<MemoId>,
    pub title: String,
    pub drawing: &'a Drawing,
    pub preview: Option<PreviewImage>,
}

impl<'a> SaveRequest<'a> {
    pub fn new(title: impl Into<String>, drawing: &'a Drawing) -> Self {
        Self {
            memo_id: None,
            title: title.into(),
            drawing,
            preview: None,
        }
    }

    pub fn for_memo(mut self, id: MemoId) -> Self {
        self.memo_id = Some(id);
        self
    }

    pub fn with_preview(mut self, preview: PreviewImage) -> Self {
        self.preview = Some(preview);
        self
    }
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs saves and deletes for one editing session.
pub struct SaveCoordinator<I, R, B> {
    identity: I,
    repository: MemoRepository<R, B>,
    busy: AtomicBool,
}

impl<I, R, B> SaveCoordinator<I, R, B>
where
    I: IdentityProvider,
    R: RecordStore,
    B: BlobStore,
{
    pub fn new(identity: I, repository: MemoRepository<R, B>) -> Self {
        Self {
            identity,
            repository,
            busy: AtomicBool::new(false),
        }
    }

    pub fn repository(&self) -> &MemoRepository<R, B> {
        &self.repository
    }

    /// Whether a save or delete is currently pending.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard<'_>, SaveError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| SaveError::Busy)
    }

    /// Persist the drawing, creating or updating the memo.
    ///
    /// An update target is checked before the preview is uploaded. A failed
    /// preview upload does not fail the save: the memo is written without a
    /// new preview path. If the record write fails, a preview uploaded for it
    /// that nothing refers to is removed again.
    pub async fn save(&self, request: SaveRequest<'_>) -> Result<Memo, SaveError> {
        let _guard = self.begin()?;
        let owner = self
            .identity
            .current_owner()
            .ok_or(SaveError::Unauthenticated)?;
        let drawing = request.drawing.to_data()?;
        let id = request.memo_id.unwrap_or_else(MemoId::new);
        let referenced = match request.memo_id {
            Some(id) => self.repository.stored_preview_path(id, owner).await?,
            None => None,
        };

        let preview_path = match request.preview {
            Some(preview) => match self
                .repository
                .upload_preview(owner, id, preview.into_bytes())
                .await
            {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("Preview upload for memo {} failed, saving without it: {}", id, e);
                    None
                }
            },
            None => None,
        };
        let uploaded = preview_path.clone();

        let written = match request.memo_id {
            Some(id) => {
                let patch = MemoPatch {
                    title: Some(request.title),
                    drawing: Some(drawing),
                    preview_image_path: preview_path,
                };
                self.repository.update(id, owner, patch).await
            }
            None => {
                let mut new = NewMemo::new(request.title, drawing).with_id(id);
                new.preview_image_path = preview_path;
                self.repository.create(owner, new).await
            }
        };
        let memo = match written {
            Ok(memo) => memo,
            Err(e) => {
                if let Some(path) = uploaded.filter(|path| referenced.as_ref() != Some(path)) {
                    self.repository.discard_preview(&path).await;
                }
                return Err(e.into());
            }
        };
        log::info!("Saved memo {} ({} strokes)", memo.id, memo.drawing.len());
        Ok(memo)
    }

    /// Delete a memo owned by the current user.
    pub async fn delete(&self, id: MemoId) -> Result<(), SaveError> {
        let _guard = self.begin()?;
        let owner = self
            .identity
            .current_owner()
            .ok_or(SaveError::Unauthenticated)?;
        self.repository.delete(id, owner).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::memo::OwnerId;
    use crate::storage::{MemoryBlobStore, MemoryRecordStore};
    use pollster::block_on;

    type Coordinator = SaveCoordinator<StaticIdentity, MemoryRecordStore, MemoryBlobStore>;

    fn coordinator(identity: StaticIdentity) -> Coordinator {
        SaveCoordinator::new(
            identity,
            MemoRepository::new(MemoryRecordStore::new(), MemoryBlobStore::new()),
        )
    }

    #[test]
    fn test_data_url_preview() {
        let preview = PreviewImage::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(preview.as_bytes(), &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        assert!(matches!(
            PreviewImage::from_data_url("iVBORw0KGgo="),
            Err(PreviewDecodeError::NotDataUrl)
        ));
        assert!(matches!(
            PreviewImage::from_data_url("data:image/jpeg;base64,AAAA"),
            Err(PreviewDecodeError::UnsupportedType(_))
        ));
        assert!(matches!(
            PreviewImage::from_data_url("data:image/png;base64,@@@"),
            Err(PreviewDecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_unauthenticated() {
        let coordinator = coordinator(StaticIdentity::anonymous());
        let drawing = Drawing::new();
        assert!(matches!(
            block_on(coordinator.save(SaveRequest::new("t", &drawing))),
            Err(SaveError::Unauthenticated)
        ));
        assert!(matches!(
            block_on(coordinator.delete(MemoId::new())),
            Err(SaveError::Unauthenticated)
        ));
        assert!(!coordinator.is_busy());
    }

    #[test]
    fn test_new_memo_preview_uses_allocated_id() {
        let owner = OwnerId::new();
        let coordinator = coordinator(StaticIdentity::logged_in(owner));
        let drawing = Drawing::new();
        let memo = block_on(coordinator.save(
            SaveRequest::new("with preview", &drawing).with_preview(PreviewImage::from_bytes(vec![7])),
        ))
        .unwrap();

        let path = crate::repository::preview_path(owner, memo.id);
        assert_eq!(memo.preview_image_path.as_deref(), Some(path.as_str()));
        assert_eq!(coordinator.repository().blobs().get(&path), Some(vec![7]));
    }

    #[test]
    fn test_update_missing_memo() {
        let coordinator = coordinator(StaticIdentity::logged_in(OwnerId::new()));
        let drawing = Drawing::new();
        let missing = MemoId::new();
        assert!(matches!(
            block_on(coordinator.save(SaveRequest::new("t", &drawing).for_memo(missing))),
            Err(SaveError::NotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_missing_target_uploads_nothing() {
        let coordinator = coordinator(StaticIdentity::logged_in(OwnerId::new()));
        let drawing = Drawing::new();
        let request = SaveRequest::new("t", &drawing)
            .for_memo(MemoId::new())
            .with_preview(PreviewImage::from_bytes(vec![1]));

        assert!(matches!(block_on(coordinator.save(request)), Err(SaveError::NotFound(_))));
        assert!(coordinator.repository().blobs().is_empty());
        assert!(!coordinator.is_busy());
    }

    #[test]
    fn test_busy_flag_rejects_second_write() {
        let coordinator = coordinator(StaticIdentity::logged_in(OwnerId::new()));
        let guard = coordinator.begin().unwrap();
        assert!(coordinator.is_busy());

        let drawing = Drawing::new();
        assert!(matches!(
            block_on(coordinator.save(SaveRequest::new("t", &drawing))),
            Err(SaveError::Busy)
        ));
        assert!(matches!(
            block_on(coordinator.delete(MemoId::new())),
            Err(SaveError::Busy)
        ));

        drop(guard);
        assert!(!coordinator.is_busy());
        assert!(block_on(coordinator.save(SaveRequest::new("t", &drawing))).is_ok());
    }
}
