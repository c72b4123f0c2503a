//! The editing session: the one mutable surface the canvas talks to.
//!
//! A session is `committed` drawing (the history cursor) plus an optional
//! in-progress stroke held by the recorder. `pointer_up` is the only
//! transition that folds the in-progress stroke into history, so a gesture
//! creates exactly one undo step no matter how many moves it contains.

use crate::drawing::{Drawing, StrokeColor};
use crate::history::{HistoryStack, Navigation};
use crate::recorder::{OpenStroke, StrokeRecorder};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default pen width for new sessions.
pub const DEFAULT_STROKE_WIDTH: f64 = 5.0;

/// Colors offered by the toolbar.
pub const PALETTE: [StrokeColor; 6] = [
    StrokeColor::new(0x00, 0x00, 0x00),
    StrokeColor::new(0xFF, 0x00, 0x00),
    StrokeColor::new(0x00, 0x00, 0xFF),
    StrokeColor::new(0x00, 0x80, 0x00),
    StrokeColor::new(0xFF, 0xFF, 0x00),
    StrokeColor::new(0xFF, 0xA5, 0x00),
];

/// Pen widths offered by the toolbar.
pub const WIDTH_PRESETS: [f64; 4] = [2.0, 5.0, 10.0, 15.0];

/// Rejected tool settings.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ToolError {
    #[error("stroke width must be positive and finite, got {0}")]
    InvalidWidth(f64),
}

/// Pointer events from the input surface, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Drawing,
}

/// What the view needs to redraw.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    pub drawing: &'a Drawing,
    pub in_progress: Option<&'a OpenStroke>,
    pub can_undo: bool,
    pub can_redo: bool,
}

type Observer = Box<dyn FnMut(&SessionView<'_>) + Send>;

/// Stroke recorder + history + tool state for one editing surface.
pub struct DrawingSession {
    history: HistoryStack,
    recorder: StrokeRecorder,
    color: StrokeColor,
    stroke_width: f64,
    observer: Option<Observer>,
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DrawingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingSession")
            .field("history", &self.history)
            .field("recorder", &self.recorder)
            .field("color", &self.color)
            .field("stroke_width", &self.stroke_width)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl DrawingSession {
    /// Start a session on a blank drawing.
    pub fn new() -> Self {
        Self::with_history(HistoryStack::default())
    }

    /// Start a session on a loaded drawing; it becomes history entry 0.
    pub fn from_drawing(drawing: Drawing) -> Self {
        Self::with_history(HistoryStack::new(drawing))
    }

    pub fn with_history(history: HistoryStack) -> Self {
        Self {
            history,
            recorder: StrokeRecorder::new(),
            color: StrokeColor::default(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            observer: None,
        }
    }

    /// Register the live-redraw callback, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(&SessionView<'_>) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn state(&self) -> SessionState {
        if self.recorder.is_open() {
            SessionState::Drawing
        } else {
            SessionState::Idle
        }
    }

    /// The committed drawing (excludes any stroke still being drawn).
    pub fn snapshot(&self) -> &Drawing {
        &self.history.current().drawing
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn in_progress(&self) -> Option<&OpenStroke> {
        self.recorder.open_stroke()
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            drawing: self.snapshot(),
            in_progress: self.recorder.open_stroke(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Route an input-surface event. Returns whether it changed anything.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down { position } => self.pointer_down(position),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up => self.pointer_up(),
        }
    }

    /// Idle → Drawing. Ignored while already drawing.
    pub fn pointer_down(&mut self, point: Point) -> bool {
        match self.recorder.begin(point, self.color, self.stroke_width) {
            Ok(()) => {
                self.publish();
                true
            }
            Err(e) => {
                log::debug!("pointer down ignored: {e}");
                false
            }
        }
    }

    /// Extend the in-progress stroke. Ignored while idle; never touches history.
    pub fn pointer_move(&mut self, point: Point) -> bool {
        match self.recorder.extend(point) {
            Ok(()) => {
                self.publish();
                true
            }
            Err(e) => {
                log::trace!("pointer move ignored: {e}");
                false
            }
        }
    }

    /// Drawing → Idle: close the stroke and commit it as one history step.
    pub fn pointer_up(&mut self) -> bool {
        let stroke = match self.recorder.end() {
            Ok(stroke) => stroke,
            Err(e) => {
                log::debug!("pointer up ignored: {e}");
                return false;
            }
        };
        let next = self.snapshot().with_stroke(stroke);
        let seq = self.history.push(next).seq;
        log::debug!("committed stroke as history entry {seq}");
        self.publish();
        true
    }

    /// Abandon the gesture in progress without committing it.
    pub fn cancel_gesture(&mut self) -> bool {
        let cancelled = self.recorder.cancel().is_some();
        if cancelled {
            self.publish();
        }
        cancelled
    }

    /// Returns `false` at the start of history.
    pub fn undo(&mut self) -> bool {
        let moved = !self.history.undo().is_noop();
        if moved {
            self.publish();
        }
        moved
    }

    /// Returns `false` at the end of history.
    pub fn redo(&mut self) -> bool {
        let moved = !matches!(self.history.redo(), Navigation::NoOp(_));
        if moved {
            self.publish();
        }
        moved
    }

    /// Erase everything as a single undoable step.
    pub fn clear(&mut self) -> bool {
        if self.snapshot().is_empty() {
            return false;
        }
        self.history.push(Drawing::new());
        self.publish();
        true
    }

    pub fn color(&self) -> StrokeColor {
        self.color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    /// Affects strokes started after this call; not recorded in history.
    pub fn set_color(&mut self, color: StrokeColor) {
        self.color = color;
    }

    /// Affects strokes started after this call; not recorded in history.
    pub fn set_width(&mut self, width: f64) -> Result<(), ToolError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(ToolError::InvalidWidth(width));
        }
        self.stroke_width = width;
        Ok(())
    }

    fn publish(&mut self) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };
        let view = SessionView {
            drawing: &self.history.current().drawing,
            in_progress: self.recorder.open_stroke(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        };
        observer(&view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_stroke_undo_redo_scenario() {
        let mut session = DrawingSession::new();
        assert!(session.pointer_down(p(10.0, 10.0)));
        assert!(session.pointer_move(p(20.0, 20.0)));
        assert!(session.pointer_up());

        let drawn = session.snapshot().clone();
        assert_eq!(drawn.len(), 1);
        assert_eq!(
            drawn.strokes().next().unwrap().flat_points(),
            vec![10.0, 10.0, 20.0, 20.0]
        );

        assert!(session.undo());
        assert!(session.snapshot().is_empty());

        assert!(session.redo());
        assert_eq!(session.snapshot(), &drawn);
    }

    #[test]
    fn test_moves_do_not_create_history() {
        let mut session = DrawingSession::new();
        session.pointer_down(p(0.0, 0.0));
        for i in 1..50 {
            session.pointer_move(p(i as f64, 0.0));
        }
        assert_eq!(session.history().len(), 1);
        assert!(session.snapshot().is_empty());
        assert_eq!(session.state(), SessionState::Drawing);

        session.pointer_up();
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.snapshot().strokes().next().unwrap().points().len(), 50);
    }

    #[test]
    fn test_idle_events_are_ignored() {
        let mut session = DrawingSession::new();
        assert!(!session.pointer_move(p(1.0, 1.0)));
        assert!(!session.pointer_up());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_duplicate_down_is_ignored() {
        let mut session = DrawingSession::new();
        assert!(session.pointer_down(p(1.0, 1.0)));
        assert!(!session.pointer_down(p(5.0, 5.0)));
        session.pointer_up();
        assert_eq!(
            session.snapshot().strokes().next().unwrap().points(),
            &[p(1.0, 1.0)]
        );
    }

    #[test]
    fn test_tool_state_is_not_history() {
        let mut session = DrawingSession::new();
        session.set_color(PALETTE[1]);
        session.set_width(10.0).unwrap();
        assert!(!session.can_undo());

        session.pointer_down(p(0.0, 0.0));
        // Changing tools mid-gesture does not restyle the open stroke.
        session.set_color(PALETTE[2]);
        session.set_width(2.0).unwrap();
        session.pointer_up();

        let stroke = session.snapshot().strokes().next().unwrap().clone();
        assert_eq!(stroke.color(), PALETTE[1]);
        assert_eq!(stroke.stroke_width(), 10.0);

        session.pointer_down(p(1.0, 1.0));
        session.pointer_up();
        let second = session.snapshot().strokes().nth(1).unwrap().clone();
        assert_eq!(second.color(), PALETTE[2]);
        assert_eq!(second.stroke_width(), 2.0);
    }

    #[test]
    fn test_invalid_width_rejected() {
        let mut session = DrawingSession::new();
        assert_eq!(session.set_width(0.0), Err(ToolError::InvalidWidth(0.0)));
        assert!(session.set_width(-1.0).is_err());
        assert!(session.set_width(f64::NAN).is_err());
        assert_eq!(session.stroke_width(), DEFAULT_STROKE_WIDTH);
    }

    #[test]
    fn test_new_stroke_after_undo_discards_redo() {
        let mut session = DrawingSession::new();
        for i in 0..3 {
            session.pointer_down(p(i as f64, 0.0));
            session.pointer_up();
        }
        session.undo();
        session.undo();
        session.pointer_down(p(9.0, 9.0));
        session.pointer_up();

        assert!(!session.can_redo());
        assert!(!session.redo());
        assert_eq!(session.snapshot().len(), 2);
    }

    #[test]
    fn test_observer_sees_live_updates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut session = DrawingSession::new();
        session.set_observer(move |view| {
            let live = view.in_progress.map(|s| s.points().len()).unwrap_or(0);
            sink.lock().unwrap().push((view.drawing.len(), live, view.can_undo));
        });

        session.pointer_down(p(0.0, 0.0));
        session.pointer_move(p(1.0, 0.0));
        session.pointer_up();
        session.undo();
        session.undo(); // no-op, not published

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, 1, false), (0, 2, false), (1, 0, true), (0, 0, false)]
        );
    }

    #[test]
    fn test_from_drawing_and_clear() {
        let mut seed = DrawingSession::new();
        seed.pointer_down(p(3.0, 3.0));
        seed.pointer_up();

        let mut session = DrawingSession::from_drawing(seed.snapshot().clone());
        assert!(!session.can_undo());
        assert!(session.clear());
        assert!(session.snapshot().is_empty());
        assert!(!session.clear());
        assert!(session.undo());
        assert_eq!(session.snapshot(), seed.snapshot());
    }

    #[test]
    fn test_handle_pointer_event_and_cancel() {
        let mut session = DrawingSession::new();
        assert!(session.handle_pointer_event(PointerEvent::Down { position: p(0.0, 0.0) }));
        assert!(session.handle_pointer_event(PointerEvent::Move { position: p(2.0, 2.0) }));
        assert!(session.cancel_gesture());
        assert!(!session.handle_pointer_event(PointerEvent::Up));
        assert!(session.snapshot().is_empty());
    }
}
