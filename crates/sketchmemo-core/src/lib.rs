//! SketchMemo Core Library
//!
//! Stroke capture, undo/redo history and owner-scoped memo persistence.
//! Platform-agnostic: rendering and input surfaces live in other crates and
//! talk to this one through [`DrawingSession`] and [`SaveCoordinator`].

pub mod drawing;
pub mod history;
pub mod identity;
pub mod memo;
pub mod recorder;
pub mod repository;
pub mod save;
pub mod session;
pub mod storage;

pub use drawing::{ColorParseError, Drawing, DrawingData, Stroke, StrokeColor, DEFAULT_TENSION};
pub use history::{HistoryEntry, HistoryStack, Navigation};
pub use identity::{IdentityProvider, StaticIdentity};
pub use memo::{Memo, MemoId, MemoPatch, MemoRow, MemoSummary, NewMemo, OwnerId};
pub use recorder::{InvalidState, OpenStroke, StrokeRecorder};
pub use repository::{MemoRepository, RepositoryError, preview_path};
pub use save::{PreviewDecodeError, PreviewImage, SaveCoordinator, SaveError, SaveRequest};
pub use session::{DrawingSession, PointerEvent, SessionState, SessionView, ToolError};
