//! # Edit Session
//!
//! One open project: the document, its history, the compile context and the
//! latest compiled document.
//!
//! Every successful change runs the same pipeline:
//!
//! ```text
//! mutate (inside history) → prune selection → compile → notify observers
//! ```
//!
//! Observers receive the new tree and html; the preview renderer and the
//! autosaver are both observers. Failed mutations notify nobody.

use crate::document::Document;
use crate::errors::EditorError;
use crate::history::History;
use crate::mutations::{Anchor, MovePosition, Mutation, MutationError, NodePatch};
use crate::plan::{Plan, PlanReport};
use tracing::{debug, info};
use vibe_compiler_html::{compile_document, CompileContext, CompiledDocument};
use vibe_tree::{Node, Tree};

/// What caused a session change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Mutation,
    Plan,
    Undo,
    Redo,
    /// A new project was loaded
    Load,
    /// Only the compile context changed
    Context,
}

/// Borrowed view handed to observers after each change
#[derive(Debug, Clone, Copy)]
pub struct SessionChange<'a> {
    pub kind: ChangeKind,
    pub label: &'a str,
    pub tree: &'a Tree,
    pub html: &'a str,
    pub version: u64,
}

/// Receives every successful session change
pub trait SessionObserver {
    fn on_change(&self, change: &SessionChange<'_>);
}

pub struct EditSession {
    document: Document,
    history: History,
    context: CompileContext,
    compiled: CompiledDocument,

    /// Currently selected node id
    selected: Option<String>,

    observers: Vec<Box<dyn SessionObserver>>,
}

impl EditSession {
    /// Create a session over `tree`
    pub fn new(tree: Tree, context: CompileContext) -> Result<Self, EditorError> {
        Self::with_history(tree, context, History::new())
    }

    /// Session over the built-in template
    pub fn template(context: CompileContext) -> Result<Self, EditorError> {
        Self::new(Tree::template(), context)
    }

    pub fn with_history(
        tree: Tree,
        context: CompileContext,
        mut history: History,
    ) -> Result<Self, EditorError> {
        let document = Document::new(tree);
        history.reset(&document)?;
        let compiled = compile_document(document.tree(), &context);

        Ok(Self {
            document,
            history,
            context,
            compiled,
            selected: None,
            observers: Vec::new(),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn tree(&self) -> &Tree {
        self.document.tree()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn context(&self) -> &CompileContext {
        &self.context
    }

    /// Latest compiled document
    pub fn compiled(&self) -> &CompiledDocument {
        &self.compiled
    }

    pub fn html(&self) -> &str {
        &self.compiled.html
    }

    pub fn version(&self) -> u64 {
        self.document.version()
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(self.document.to_json()?)
    }

    /// Apply one mutation as one undoable step
    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), EditorError> {
        let label = mutation.label();
        let before = self.document.version();

        self.history
            .with_history(&mut self.document, &label, |doc| {
                mutation.apply(doc).map_err(EditorError::from)
            })?;

        if self.document.version() != before {
            self.after_change(ChangeKind::Mutation, &label);
        }
        Ok(())
    }

    pub fn create_child(
        &mut self,
        parent_id: &str,
        node: Node,
        anchor: Option<Anchor>,
    ) -> Result<(), EditorError> {
        self.apply(&Mutation::CreateChild {
            parent_id: parent_id.to_string(),
            node,
            anchor,
        })
    }

    pub fn update_node(&mut self, node_id: &str, patch: NodePatch) -> Result<(), EditorError> {
        self.apply(&Mutation::UpdateNode {
            node_id: node_id.to_string(),
            description: patch.description,
            code: patch.code,
        })
    }

    pub fn delete_node(&mut self, node_id: &str) -> Result<(), EditorError> {
        self.apply(&Mutation::DeleteNode {
            node_id: node_id.to_string(),
        })
    }

    pub fn move_node(
        &mut self,
        source_id: &str,
        target_id: &str,
        position: MovePosition,
    ) -> Result<(), EditorError> {
        self.apply(&Mutation::MoveNode {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            position,
        })
    }

    pub fn swap_siblings(&mut self, first_id: &str, second_id: &str) -> Result<(), EditorError> {
        self.apply(&Mutation::SwapSiblings {
            first_id: first_id.to_string(),
            second_id: second_id.to_string(),
        })
    }

    pub fn replace_tree(&mut self, root: Node) -> Result<(), EditorError> {
        self.apply(&Mutation::ReplaceTree { tree: root })
    }

    /// Apply a whole plan as a single undoable step
    pub fn apply_plan(&mut self, plan: &Plan) -> Result<PlanReport, EditorError> {
        let label = plan.label();
        let before = self.document.version();

        let report = self
            .history
            .with_history(&mut self.document, &label, |doc| {
                Ok::<_, EditorError>(plan.apply(doc))
            })?;

        info!(
            label = %label,
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "Applied plan"
        );

        if self.document.version() != before {
            self.after_change(ChangeKind::Plan, &label);
        }
        Ok(report)
    }

    /// Parse and apply an AI response; a malformed response changes nothing
    pub fn apply_plan_json(&mut self, json: &str) -> Result<PlanReport, EditorError> {
        let plan = Plan::from_json(json)?;
        self.apply_plan(&plan)
    }

    /// Snapshot the current tree explicitly
    pub fn record(&mut self, label: &str) -> Result<bool, EditorError> {
        Ok(self.history.record(&self.document, label)?)
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let label = self.history.undo_label().unwrap_or_default().to_string();
        if !self.history.undo(&mut self.document)? {
            return Ok(false);
        }
        self.after_change(ChangeKind::Undo, &label);
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let label = self.history.redo_label().unwrap_or_default().to_string();
        if !self.history.redo(&mut self.document)? {
            return Ok(false);
        }
        self.after_change(ChangeKind::Redo, &label);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Switch to another project's tree, starting a fresh history
    pub fn load(&mut self, tree: Tree) -> Result<(), EditorError> {
        self.document.restore(tree);
        self.history.reset(&self.document)?;
        self.after_change(ChangeKind::Load, "Load project");
        Ok(())
    }

    /// Recompile for a different user/project pair
    pub fn set_context(&mut self, context: CompileContext) {
        self.context = context;
        self.after_change(ChangeKind::Context, "Change context");
    }

    pub fn select(&mut self, node_id: &str) -> Result<(), EditorError> {
        if !self.document.tree().contains(node_id) {
            return Err(MutationError::NotFound(node_id.to_string()).into());
        }
        self.selected = Some(node_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected
            .as_deref()
            .and_then(|id| self.document.find(id))
    }

    fn after_change(&mut self, kind: ChangeKind, label: &str) {
        if let Some(id) = &self.selected {
            if !self.document.tree().contains(id) {
                debug!(node_id = %id, "Selected node is gone; clearing selection");
                self.selected = None;
            }
        }

        self.compiled = compile_document(self.document.tree(), &self.context);

        let change = SessionChange {
            kind,
            label,
            tree: self.document.tree(),
            html: &self.compiled.html,
            version: self.document.version(),
        };
        for observer in &self.observers {
            observer.on_change(&change);
        }
    }
}
