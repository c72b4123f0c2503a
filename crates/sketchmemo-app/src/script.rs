//! Pointer scripts: recorded input replayed through a drawing session.
//!
//! A script is a JSON array of single-key objects:
//!
//! ```json
//! [{"down": [10, 10]}, {"move": [20, 20]}, {"up": null},
//!  {"color": "#FF0000"}, {"width": 10}, {"undo": null}]
//! ```

use kurbo::Point;
use serde::Deserialize;
use sketchmemo_core::{DrawingSession, PointerEvent, StrokeColor, ToolError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Event {index}: {source}")]
    Tool {
        index: usize,
        #[source]
        source: ToolError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptEvent {
    Down([f64; 2]),
    Move([f64; 2]),
    Up,
    Cancel,
    Undo,
    Redo,
    Clear,
    Color(StrokeColor),
    Width(f64),
}

/// What a replay did to the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events that changed the session.
    pub applied: usize,
    /// Events the session ignored, such as a move while not drawing.
    pub ignored: usize,
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptEvent>, ScriptError> {
    let json = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_script(&json)
}

/// Feed every event to `session`.
///
/// A gesture left open at the end of the script is abandoned, not committed.
pub fn replay(session: &mut DrawingSession, events: &[ScriptEvent]) -> Result<ReplaySummary, ScriptError> {
    let mut summary = ReplaySummary::default();
    for (index, event) in events.iter().enumerate() {
        let changed = match *event {
            ScriptEvent::Down([x, y]) => session.handle_pointer_event(PointerEvent::Down {
                position: Point::new(x, y),
            }),
            ScriptEvent::Move([x, y]) => session.handle_pointer_event(PointerEvent::Move {
                position: Point::new(x, y),
            }),
            ScriptEvent::Up => session.handle_pointer_event(PointerEvent::Up),
            ScriptEvent::Cancel => session.cancel_gesture(),
            ScriptEvent::Undo => session.undo(),
            ScriptEvent::Redo => session.redo(),
            ScriptEvent::Clear => session.clear(),
            ScriptEvent::Color(color) => {
                session.set_color(color);
                true
            }
            ScriptEvent::Width(width) => {
                session
                    .set_width(width)
                    .map_err(|source| ScriptError::Tool { index, source })?;
                true
            }
        };
        if changed {
            summary.applied += 1;
        } else {
            summary.ignored += 1;
        }
    }
    if session.cancel_gesture() {
        log::warn!("Script ended mid-stroke; the open stroke was discarded");
    }
    Ok(summary)
}
