//! # Vibe Editor
//!
//! Editing engine for Vibe Trees.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ UI handler / AI plan                        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - History snapshots the pre-state          │
//! │  - Document applies the mutation            │
//! │  - Selector chains repaired per parent      │
//! │  - Tree recompiled, observers notified      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ preview renderer, autosave                  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the source of truth**: compiled html is a derived view
//! 2. **All-or-nothing mutations**: validation happens before any change
//! 3. **One history entry per user intent**: a whole AI plan undoes at once
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vibe_editor::{EditSession, MovePosition};
//! use vibe_compiler_html::CompileContext;
//! use vibe_tree::Node;
//!
//! let mut session = EditSession::template(CompileContext::anonymous())?;
//!
//! session.create_child(
//!     "whole-page",
//!     Node::html("hero", r#"<section id="hero-el"></section>"#),
//!     None,
//! )?;
//! session.move_node("hero", "page-head", MovePosition::After)?;
//!
//! session.undo()?;
//! let html = session.html();
//! ```

mod document;
mod errors;
mod history;
mod mutations;
mod plan;
mod session;

pub use document::Document;
pub use errors::EditorError;
pub use history::{History, HistoryError, Snapshot, DEFAULT_MAX_LEVELS};
pub use mutations::{Anchor, MovePosition, Mutation, MutationError, NodePatch, Side};
pub use plan::{Plan, PlanReport, SkippedAction};
pub use session::{ChangeKind, EditSession, SessionChange, SessionObserver};

// Re-export common types for convenience
pub use vibe_compiler_html::{CompileContext, CompiledDocument};
pub use vibe_tree::{Node, NodeKind, Position, Tree};
