//! Memo records and identifiers.

use crate::drawing::{Drawing, DrawingData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a persisted memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoId(Uuid);

impl MemoId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MemoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MemoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for MemoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identity of the authenticated user owning a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for OwnerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A memo as stored: one row of the record store.
///
/// `owner_id` is fixed at creation; `updated_at` is stamped on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoRow {
    pub id: MemoId,
    pub owner_id: OwnerId,
    pub title: String,
    pub drawing_data: DrawingData,
    pub preview_image_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A memo loaded for its owner, with the drawing parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Memo {
    pub id: MemoId,
    pub owner_id: OwnerId,
    pub title: String,
    pub drawing: Drawing,
    pub preview_image_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// List-view projection of a memo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoSummary {
    pub id: MemoId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub preview_image_path: Option<String>,
    /// Public URL of the preview, when there is one.
    pub preview_url: Option<String>,
}

impl MemoSummary {
    /// Title for display; untitled memos get a placeholder.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled Memo"
        } else {
            &self.title
        }
    }
}

/// Fields of a memo about to be created.
///
/// The id is allocated up front so a preview can be stored under it before
/// the record exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemo {
    pub id: MemoId,
    pub title: String,
    pub drawing: DrawingData,
    pub preview_image_path: Option<String>,
}

impl NewMemo {
    pub fn new(title: impl Into<String>, drawing: DrawingData) -> Self {
        Self {
            id: MemoId::new(),
            title: title.into(),
            drawing,
            preview_image_path: None,
        }
    }

    pub fn with_id(mut self, id: MemoId) -> Self {
        self.id = id;
        self
    }

    pub fn with_preview(mut self, path: impl Into<String>) -> Self {
        self.preview_image_path = Some(path.into());
        self
    }
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoPatch {
    pub title: Option<String>,
    pub drawing: Option<DrawingData>,
    pub preview_image_path: Option<String>,
}

impl MemoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.drawing.is_none() && self.preview_image_path.is_none()
    }

    pub(crate) fn apply(self, row: &mut MemoRow) {
        if let Some(title) = self.title {
            row.title = title;
        }
        if let Some(drawing) = self.drawing {
            row.drawing_data = drawing;
        }
        if let Some(path) = self.preview_image_path {
            row.preview_image_path = Some(path);
        }
    }
}
