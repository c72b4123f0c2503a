//! Undo/redo ledger of drawing snapshots.

use crate::drawing::Drawing;

/// A drawing snapshot tagged with its position in the edit sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Monotonically increasing across the life of the stack, never reused.
    pub seq: u64,
    pub drawing: Drawing,
}

/// Result of an undo or redo request.
///
/// Hitting either end of the history is not an error: the current entry is
/// returned unchanged as [`Navigation::NoOp`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Navigation<'a> {
    Moved(&'a HistoryEntry),
    NoOp(&'a HistoryEntry),
}

impl<'a> Navigation<'a> {
    /// The entry at the cursor after the request.
    pub fn entry(self) -> &'a HistoryEntry {
        match self {
            Navigation::Moved(e) | Navigation::NoOp(e) => e,
        }
    }

    pub fn is_noop(self) -> bool {
        matches!(self, Navigation::NoOp(_))
    }
}

/// Linear undo history with a cursor.
///
/// Always holds at least one entry and keeps `cursor < entries.len()`.
/// Entries past the cursor are only reachable through [`redo`](Self::redo)
/// and are dropped by the next [`push`](Self::push).
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    next_seq: u64,
    limit: Option<usize>,
}

impl HistoryStack {
    /// Start a history whose entry 0 is `initial`.
    pub fn new(initial: Drawing) -> Self {
        Self {
            entries: vec![HistoryEntry {
                seq: 0,
                drawing: initial,
            }],
            cursor: 0,
            next_seq: 1,
            limit: None,
        }
    }

    /// Like [`new`](Self::new), but keep at most `limit` entries (minimum 1),
    /// evicting the oldest.
    pub fn with_limit(initial: Drawing, limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new(initial)
        }
    }

    /// Record `drawing` as the newest state, discarding any redo entries.
    pub fn push(&mut self, drawing: Drawing) -> &HistoryEntry {
        let discarded = self.entries.len() - 1 - self.cursor;
        if discarded > 0 {
            log::debug!("history: dropping {discarded} redo entries");
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            seq: self.next_seq,
            drawing,
        });
        self.next_seq += 1;

        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let overflow = self.entries.len() - limit;
                self.entries.drain(..overflow);
            }
        }
        self.cursor = self.entries.len() - 1;
        &self.entries[self.cursor]
    }

    /// Step back one entry.
    pub fn undo(&mut self) -> Navigation<'_> {
        if self.cursor > 0 {
            self.cursor -= 1;
            Navigation::Moved(&self.entries[self.cursor])
        } else {
            Navigation::NoOp(&self.entries[self.cursor])
        }
    }

    /// Step forward one entry.
    pub fn redo(&mut self) -> Navigation<'_> {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
            Navigation::Moved(&self.entries[self.cursor])
        } else {
            Navigation::NoOp(&self.entries[self.cursor])
        }
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; a history always holds its initial entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(Drawing::new())
    }
}
