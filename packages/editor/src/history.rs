//! # Undo/Redo History
//!
//! Snapshot journal over a [`Document`].
//!
//! ## Design
//!
//! - `last_snapshot` is the serialization of the tree as history last saw it
//! - `record(label)` pushes `last_snapshot` onto the undo stack when the tree
//!   has changed since, and clears the redo stack
//! - Undo/redo swap whole snapshots; the `restoring` flag keeps a restore from
//!   being recorded as a new edit
//! - [`History::with_history`] records around a mutation so that the undo
//!   entry is always the pre-mutation state
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! let mut document = Document::template();
//!
//! history.with_history(&mut document, "Create hero", |doc| {
//!     doc.create_child("whole-page", hero, None)
//! })?;
//!
//! history.undo(&mut document)?; // back to the template
//! history.redo(&mut document)?; // hero again
//! ```

use crate::document::Document;
use thiserror::Error;
use tracing::debug;
use vibe_tree::{Tree, TreeError};

/// Default maximum number of undo levels
pub const DEFAULT_MAX_LEVELS: usize = 100;

const EXTERNAL_CHANGE: &str = "External change";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("Snapshot could not be taken or restored: {0}")]
    Snapshot(#[from] TreeError),
}

/// A serialized tree plus the label of the change that followed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub label: String,
    pub json: String,
}

/// Linear undo/redo history
#[derive(Debug)]
pub struct History {
    /// States before each recorded change (most recent last)
    undo_stack: Vec<Snapshot>,

    /// States undone from (most recent last)
    redo_stack: Vec<Snapshot>,

    /// `None` until the first record establishes a baseline
    last_snapshot: Option<String>,

    restoring: bool,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl History {
    /// Create a history with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_MAX_LEVELS)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            last_snapshot: None,
            restoring: false,
            max_levels,
        }
    }

    /// Record the document's current state if it differs from the last one seen
    ///
    /// Returns whether an undo entry was pushed.
    pub fn record(&mut self, document: &Document, label: &str) -> Result<bool, HistoryError> {
        if self.restoring {
            return Ok(false);
        }

        let current = document.to_json()?;
        match self.last_snapshot.take() {
            None => {
                self.last_snapshot = Some(current);
                Ok(false)
            }
            Some(last) if last == current => {
                self.last_snapshot = Some(last);
                Ok(false)
            }
            Some(last) => {
                self.push_undo(Snapshot {
                    label: label.to_string(),
                    json: last,
                });
                self.redo_stack.clear();
                self.last_snapshot = Some(current);
                debug!(label, levels = self.undo_stack.len(), "Recorded history entry");
                Ok(true)
            }
        }
    }

    /// Run `mutate` as one undoable step
    ///
    /// State that changed outside history is recorded first, so the new entry
    /// restores exactly the pre-mutation tree. A failing `mutate` leaves the
    /// history untouched.
    pub fn with_history<T, E>(
        &mut self,
        document: &mut Document,
        label: &str,
        mutate: impl FnOnce(&mut Document) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<HistoryError>,
    {
        self.record(document, EXTERNAL_CHANGE)?;
        let value = mutate(document)?;
        self.record(document, label)?;
        Ok(value)
    }

    /// Restore the state before the most recent change
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, document: &mut Document) -> Result<bool, HistoryError> {
        let Some(entry) = self.undo_stack.last() else {
            return Ok(false);
        };
        let tree = Tree::from_json(&entry.json)?;
        let current = document.to_json()?;

        let Some(entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        self.redo_stack.push(Snapshot {
            label: entry.label.clone(),
            json: current,
        });
        self.restore(document, tree, entry);
        Ok(true)
    }

    /// Re-apply the most recently undone change
    pub fn redo(&mut self, document: &mut Document) -> Result<bool, HistoryError> {
        let Some(entry) = self.redo_stack.last() else {
            return Ok(false);
        };
        let tree = Tree::from_json(&entry.json)?;
        let current = document.to_json()?;

        let Some(entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        self.undo_stack.push(Snapshot {
            label: entry.label.clone(),
            json: current,
        });
        self.restore(document, tree, entry);
        Ok(true)
    }

    fn restore(&mut self, document: &mut Document, tree: Tree, entry: Snapshot) {
        self.restoring = true;
        document.restore(tree);
        self.last_snapshot = Some(entry.json);
        self.restoring = false;
        debug!(label = %entry.label, undo = self.undo_stack.len(), redo = self.redo_stack.len(), "Restored snapshot");
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the change the next undo reverts
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|entry| entry.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|entry| entry.label.as_str())
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Drop all entries, keeping the current baseline
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Start over from `document` (project load)
    pub fn reset(&mut self, document: &Document) -> Result<(), HistoryError> {
        self.clear();
        self.last_snapshot = Some(document.to_json()?);
        Ok(())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
