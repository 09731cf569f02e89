//! # Document Handle
//!
//! Exclusive owner of one open project's Vibe Tree. External code reads the
//! tree through [`Document::tree`] and changes it only through the mutation
//! operations below, which keep the selector chain and id invariants intact.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Mutate → Recalculate chains → Compile → Save
//!   ↓       ↓            ↓                ↓        ↓
//! JSON    Tree     selector/position     HTML    adapter
//! ```

use crate::mutations::{Anchor, MovePosition, MutationError, NodePatch, Side};
use std::collections::HashSet;
use tracing::debug;
use vibe_tree::{recalculate, Node, NodeKind, Tree, TreeError};

/// Editable Vibe Tree
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    tree: Tree,

    /// Increments on every change, including history restores
    version: u64,
}

impl Document {
    pub fn new(tree: Tree) -> Self {
        Self { tree, version: 0 }
    }

    /// Document holding the built-in template
    pub fn template() -> Self {
        Self::new(Tree::template())
    }

    pub fn from_json(json: &str) -> Result<Self, MutationError> {
        let tree = Tree::from_json(json).map_err(MutationError::InvalidTree)?;
        Ok(Self::new(tree))
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.tree.find(id)
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        self.tree.to_json()
    }

    /// Insert `node` under `parent_id`, at the end or next to `anchor`
    pub fn create_child(
        &mut self,
        parent_id: &str,
        node: Node,
        anchor: Option<&Anchor>,
    ) -> Result<(), MutationError> {
        let parent = self.require(parent_id)?;
        if !parent.can_hold_children() {
            return Err(MutationError::InvalidParent {
                id: parent.id.clone(),
                node_type: parent.node_type(),
            });
        }

        let index = match anchor {
            None => parent.children.len(),
            Some(anchor) => {
                let at = parent.child_index(&anchor.sibling_id).ok_or_else(|| {
                    MutationError::AnchorNotChild {
                        anchor: anchor.sibling_id.clone(),
                        parent: parent_id.to_string(),
                    }
                })?;
                match anchor.side {
                    Side::Before => at,
                    Side::After => at + 1,
                }
            }
        };

        self.check_insertable(&node)?;

        let node_id = node.id.clone();
        let parent = self.require_mut(parent_id)?;
        parent.children.insert(index, node);
        recalculate(parent);
        recalculate_subtree(&mut parent.children[index]);
        self.bump();

        debug!(node_id = %node_id, parent_id, index, "Created child");
        Ok(())
    }

    /// Apply a literal patch; returns whether anything changed
    pub fn update_node(&mut self, node_id: &str, patch: &NodePatch) -> Result<bool, MutationError> {
        let node = self.require_mut(node_id)?;
        let mut changed = false;
        let mut moved_anchor = false;

        if let Some(description) = &patch.description {
            if node.description != *description {
                node.description = description.clone();
                changed = true;
            }
        }

        if let Some(code) = &patch.code {
            if matches!(node.kind, NodeKind::Container) {
                debug!(node_id, "Ignoring code patch on container");
            } else if node.code != *code {
                node.code = code.clone();
                changed = true;
                // The element id may have changed, which re-anchors the next sibling
                moved_anchor = node.is_html();
            }
        }

        if moved_anchor {
            if let Some(parent) = self.tree.parent_of_mut(node_id) {
                recalculate(parent);
            }
        }
        if changed {
            self.bump();
        }
        Ok(changed)
    }

    /// Remove a node and its subtree; returns the removed node
    pub fn delete_node(&mut self, node_id: &str) -> Result<Node, MutationError> {
        if self.tree.root().id == node_id {
            return Err(MutationError::CannotDeleteRoot);
        }

        let removed = {
            let parent = self
                .tree
                .parent_of_mut(node_id)
                .ok_or_else(|| MutationError::NotFound(node_id.to_string()))?;
            let index = parent
                .child_index(node_id)
                .ok_or_else(|| MutationError::NotFound(node_id.to_string()))?;
            let removed = parent.children.remove(index);
            recalculate(parent);
            removed
        };
        self.bump();

        debug!(node_id, descendants = removed.walk().count() - 1, "Deleted node");
        Ok(removed)
    }

    pub fn move_node(
        &mut self,
        source_id: &str,
        target_id: &str,
        position: MovePosition,
    ) -> Result<(), MutationError> {
        self.require(source_id)?;
        let target = self.require(target_id)?;

        if source_id == target_id || self.tree.is_descendant(source_id, target_id) {
            return Err(MutationError::CyclicMove {
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
            });
        }

        let destination_id = match position {
            MovePosition::Inside => {
                if !target.can_hold_children() {
                    return Err(MutationError::InvalidParent {
                        id: target.id.clone(),
                        node_type: target.node_type(),
                    });
                }
                target_id.to_string()
            }
            MovePosition::Before | MovePosition::After => self
                .tree
                .parent_of(target_id)
                .map(|parent| parent.id.clone())
                .ok_or(MutationError::RootHasNoSiblings)?,
        };

        // The source is not the root: the root contains every target
        let (old_parent_id, old_index, node) = {
            let parent = self
                .tree
                .parent_of_mut(source_id)
                .ok_or_else(|| MutationError::NotFound(source_id.to_string()))?;
            let index = parent
                .child_index(source_id)
                .ok_or_else(|| MutationError::NotFound(source_id.to_string()))?;
            let node = parent.children.remove(index);
            recalculate(parent);
            (parent.id.clone(), index, node)
        };

        match self.tree.find_mut(&destination_id) {
            Some(parent) => {
                let index = match position {
                    MovePosition::Inside => parent.children.len(),
                    MovePosition::Before => parent.child_index(target_id).unwrap_or(0),
                    MovePosition::After => parent
                        .child_index(target_id)
                        .map_or(parent.children.len(), |at| at + 1),
                };
                parent.children.insert(index, node);
                recalculate(parent);
            }
            None => {
                // Unreachable after validation; put the node back untouched
                if let Some(parent) = self.tree.find_mut(&old_parent_id) {
                    parent.children.insert(old_index, node);
                    recalculate(parent);
                }
                return Err(MutationError::NotFound(destination_id));
            }
        }
        self.bump();

        debug!(source_id, target_id, ?position, from = %old_parent_id, to = %destination_id, "Moved node");
        Ok(())
    }

    /// Exchange the positions of two children of the same parent
    pub fn swap_siblings(&mut self, first: &str, second: &str) -> Result<(), MutationError> {
        self.require(first)?;
        self.require(second)?;
        if first == second {
            return Ok(());
        }

        let not_siblings = || MutationError::NotSiblings {
            first: first.to_string(),
            second: second.to_string(),
        };

        {
            let parent = self.tree.parent_of_mut(first).ok_or_else(not_siblings)?;
            let a = parent.child_index(first).ok_or_else(not_siblings)?;
            let b = parent.child_index(second).ok_or_else(not_siblings)?;
            parent.children.swap(a, b);
            recalculate(parent);
        }
        self.bump();

        debug!(first, second, "Swapped siblings");
        Ok(())
    }

    /// Validate and install a whole new tree
    pub fn replace_tree(&mut self, root: Node) -> Result<(), MutationError> {
        let mut tree = Tree::new(root).map_err(MutationError::InvalidTree)?;
        if tree.is_structured() {
            recalculate_subtree(tree.root_mut());
        }

        debug!(nodes = tree.node_count(), structured = tree.is_structured(), "Replaced tree");
        self.tree = tree;
        self.bump();
        Ok(())
    }

    /// Install a tree as-is, keeping its stored placements
    pub fn restore(&mut self, tree: Tree) {
        self.tree = tree;
        self.bump();
    }

    fn require(&self, id: &str) -> Result<&Node, MutationError> {
        self.tree
            .find(id)
            .ok_or_else(|| MutationError::NotFound(id.to_string()))
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut Node, MutationError> {
        self.tree
            .find_mut(id)
            .ok_or_else(|| MutationError::NotFound(id.to_string()))
    }

    /// Every id in the new subtree must be free and the tree keeps one head at most
    fn check_insertable(&self, node: &Node) -> Result<(), MutationError> {
        let mut seen = HashSet::new();
        let mut heads = usize::from(self.tree.head().is_some());

        for candidate in node.walk() {
            if candidate.id.is_empty() {
                return Err(MutationError::EmptyId);
            }
            if self.tree.contains(&candidate.id) || !seen.insert(candidate.id.as_str()) {
                return Err(MutationError::DuplicateId(candidate.id.clone()));
            }

            match candidate.kind {
                NodeKind::Head => {
                    heads += 1;
                    if heads > 1 {
                        return Err(MutationError::DuplicateHead(candidate.id.clone()));
                    }
                }
                NodeKind::RawHtmlContainer => {
                    return Err(MutationError::InvalidTree(
                        TreeError::MisplacedRawDocument(candidate.id.clone()),
                    ))
                }
                _ => {}
            }

            if !candidate.children.is_empty() && !candidate.can_hold_children() {
                return Err(MutationError::InvalidParent {
                    id: candidate.id.clone(),
                    node_type: candidate.node_type(),
                });
            }
        }

        Ok(())
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::template()
    }
}

/// Re-derive the chain of every sibling group under `node`
fn recalculate_subtree(node: &mut Node) {
    if node.can_hold_children() {
        recalculate(node);
    }
    for child in node.children.iter_mut() {
        recalculate_subtree(child);
    }
}
