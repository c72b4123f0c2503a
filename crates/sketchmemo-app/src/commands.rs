//! Command implementations, independent of the storage backend.

use crate::config::AppConfig;
use crate::script::{self, ScriptEvent};
use anyhow::{Context, Result, bail};
use sketchmemo_core::storage::{BlobStore, RecordStore};
use sketchmemo_core::{
    Drawing, DrawingSession, HistoryStack, Memo, MemoId, MemoRepository, MemoSummary, OwnerId,
    PreviewImage, SaveCoordinator, SaveRequest, StaticIdentity,
};
use sketchmemo_render::{PreviewOptions, PreviewRenderer, RasterRenderer};

/// Everything a command needs: configuration, the renderer, and a save
/// coordinator bound to the configured owner.
pub struct App<R, B> {
    config: AppConfig,
    owner: Option<OwnerId>,
    coordinator: SaveCoordinator<StaticIdentity, R, B>,
    renderer: RasterRenderer,
}

impl<R: RecordStore, B: BlobStore> App<R, B> {
    pub fn new(config: AppConfig, records: R, blobs: B) -> Self {
        let owner = config.owner_id;
        let identity = owner.map_or_else(StaticIdentity::anonymous, StaticIdentity::logged_in);
        Self {
            config,
            owner,
            coordinator: SaveCoordinator::new(identity, MemoRepository::new(records, blobs)),
            renderer: RasterRenderer::new(),
        }
    }

    fn owner(&self) -> Result<OwnerId> {
        match self.owner {
            Some(owner) => Ok(owner),
            None => bail!(
                "Not logged in: run `sketchmemo init`, set owner_id in the config or {}",
                crate::config::ENV_OWNER
            ),
        }
    }

    fn repository(&self) -> &MemoRepository<R, B> {
        self.coordinator.repository()
    }

    fn preview_options(&self) -> PreviewOptions {
        PreviewOptions::default().with_size(self.config.preview_width, self.config.preview_height)
    }

    fn session_for(&self, drawing: Drawing) -> Result<DrawingSession> {
        let history = match self.config.history_limit {
            Some(limit) => HistoryStack::with_limit(drawing, limit),
            None => HistoryStack::new(drawing),
        };
        let mut session = DrawingSession::with_history(history);
        session.set_color(self.config.default_color);
        session.set_width(self.config.default_width)?;
        Ok(session)
    }

    /// Create a blank memo.
    pub fn new_memo(&self, title: &str) -> Result<Memo> {
        let owner = self.owner()?;
        Ok(pollster::block_on(self.repository().create_from_title(owner, title))?)
    }

    /// Replay `events` onto a new memo or an existing one, render a preview
    /// and save.
    pub fn draw(&self, memo_id: Option<MemoId>, title: Option<String>, events: &[ScriptEvent]) -> Result<Memo> {
        let owner = self.owner()?;
        let (drawing, existing_title) = match memo_id {
            Some(id) => {
                let memo = pollster::block_on(self.repository().load_owned(id, owner))?;
                (memo.drawing, Some(memo.title))
            }
            None => (Drawing::new(), None),
        };
        let title = title.or(existing_title).unwrap_or_default();

        let mut session = self.session_for(drawing)?;
        let summary = script::replay(&mut session, events)?;
        log::info!(
            "Replayed {} events ({} ignored): {} strokes",
            summary.applied + summary.ignored,
            summary.ignored,
            session.snapshot().len()
        );

        let preview = match self.renderer.render_png(session.snapshot(), &self.preview_options()) {
            Ok(png) => Some(PreviewImage::from_bytes(png)),
            Err(e) => {
                log::warn!("Preview rendering failed, saving without preview: {}", e);
                None
            }
        };

        let mut request = SaveRequest::new(title, session.snapshot());
        request.memo_id = memo_id;
        request.preview = preview;
        Ok(pollster::block_on(self.coordinator.save(request))?)
    }

    /// The owner's memos, newest first.
    pub fn list(&self) -> Result<Vec<MemoSummary>> {
        let owner = self.owner()?;
        Ok(pollster::block_on(self.repository().list_owned(owner))?)
    }

    pub fn show(&self, id: MemoId) -> Result<Memo> {
        let owner = self.owner()?;
        pollster::block_on(self.repository().load_owned(id, owner))
            .with_context(|| format!("Cannot open memo {}", id))
    }

    pub fn delete(&self, id: MemoId) -> Result<()> {
        self.owner()?;
        pollster::block_on(self.coordinator.delete(id)).with_context(|| format!("Cannot delete memo {}", id))
    }
}
