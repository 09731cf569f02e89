//! # Tree Mutations
//!
//! The only operations that change a Vibe Tree.
//!
//! ## Mutation Semantics
//!
//! Every mutation validates completely before touching the tree, so a failed
//! mutation leaves the document exactly as it was. Structural mutations then
//! re-derive the selector chain of each parent whose html children changed.
//!
//! ### Create
//! - Appends to the parent, or inserts before/after an anchor sibling
//! - Every id in the new subtree must be unused
//!
//! ### Update
//! - Applies the literal patch; a code patch on a container is ignored
//!
//! ### Move
//! - Detaches from the old parent and attaches relative to the target
//! - Fails if the target is the source or one of its descendants
//!
//! ## Wire Format
//!
//! Mutations are the actions of an AI plan:
//!
//! ```json
//! { "action": "createChild", "parentId": "whole-page", "node": { ... } }
//! { "action": "moveNode", "sourceId": "footer", "targetId": "hero", "position": "inside" }
//! ```

use crate::document::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vibe_tree::{Node, NodeType, TreeError};

/// Semantic tree operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    /// Insert a new node (and its subtree) under a parent
    CreateChild {
        parent_id: String,
        node: Node,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anchor: Option<Anchor>,
    },

    /// Patch description and/or code of a node
    UpdateNode {
        node_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Remove a node and its descendants
    DeleteNode { node_id: String },

    /// Relocate a node relative to a target
    MoveNode {
        source_id: String,
        target_id: String,
        position: MovePosition,
    },

    /// Exchange two nodes that share a parent
    SwapSiblings { first_id: String, second_id: String },

    /// Replace the whole tree
    ReplaceTree { tree: Node },
}

/// Insert point relative to an existing sibling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub sibling_id: String,
    pub side: Side,
}

impl Anchor {
    pub fn before(sibling_id: impl Into<String>) -> Self {
        Self {
            sibling_id: sibling_id.into(),
            side: Side::Before,
        }
    }

    pub fn after(sibling_id: impl Into<String>) -> Self {
        Self {
            sibling_id: sibling_id.into(),
            side: Side::After,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Before,
    After,
}

/// Where a moved node lands relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePosition {
    Before,
    After,
    /// Last child of the target
    Inside,
}

/// Fields an update may replace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl NodePatch {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            description: None,
            code: Some(code.into()),
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            code: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.code.is_none()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Id already in use: {0}")]
    DuplicateId(String),

    #[error("Node id must not be empty")]
    EmptyId,

    #[error("Cannot delete the root node")]
    CannotDeleteRoot,

    #[error("Cannot move {source_id} relative to {target_id}: target is the node itself or inside it")]
    CyclicMove { source_id: String, target_id: String },

    #[error("{first} and {second} do not share a parent")]
    NotSiblings { first: String, second: String },

    #[error("Invalid tree: {0}")]
    InvalidTree(#[source] TreeError),

    #[error("{node_type} node {id} cannot hold children")]
    InvalidParent { id: String, node_type: NodeType },

    #[error("Tree already has a head node; cannot add {0}")]
    DuplicateHead(String),

    #[error("Anchor {anchor} is not a child of {parent}")]
    AnchorNotChild { anchor: String, parent: String },

    #[error("The root node has no siblings")]
    RootHasNoSiblings,
}

impl Mutation {
    /// Apply to a document; the document is untouched on error
    pub fn apply(&self, document: &mut Document) -> Result<(), MutationError> {
        match self {
            Mutation::CreateChild {
                parent_id,
                node,
                anchor,
            } => document.create_child(parent_id, node.clone(), anchor.as_ref()),

            Mutation::UpdateNode {
                node_id,
                description,
                code,
            } => {
                let patch = NodePatch {
                    description: description.clone(),
                    code: code.clone(),
                };
                document.update_node(node_id, &patch).map(|_| ())
            }

            Mutation::DeleteNode { node_id } => document.delete_node(node_id).map(|_| ()),

            Mutation::MoveNode {
                source_id,
                target_id,
                position,
            } => document.move_node(source_id, target_id, *position),

            Mutation::SwapSiblings {
                first_id,
                second_id,
            } => document.swap_siblings(first_id, second_id),

            Mutation::ReplaceTree { tree } => document.replace_tree(tree.clone()),
        }
    }

    /// Short human-facing description used as the history label
    pub fn label(&self) -> String {
        match self {
            Mutation::CreateChild { node, .. } => format!("Create {}", node.id),
            Mutation::UpdateNode { node_id, .. } => format!("Update {node_id}"),
            Mutation::DeleteNode { node_id } => format!("Delete {node_id}"),
            Mutation::MoveNode { source_id, .. } => format!("Move {source_id}"),
            Mutation::SwapSiblings {
                first_id,
                second_id,
            } => format!("Swap {first_id} and {second_id}"),
            Mutation::ReplaceTree { .. } => "Replace tree".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_mutation_wire_format() {
        let mutation = Mutation::MoveNode {
            source_id: "footer".to_string(),
            target_id: "hero".to_string(),
            position: MovePosition::Inside,
        };

        assert_eq!(
            serde_json::to_value(&mutation).unwrap(),
            json!({
                "action": "moveNode",
                "sourceId": "footer",
                "targetId": "hero",
                "position": "inside"
            })
        );
    }

    #[test]
    fn test_create_child_from_json() {
        let mutation: Mutation = serde_json::from_value(json!({
            "action": "createChild",
            "parentId": "whole-page",
            "node": { "id": "hero", "type": "html", "code": "<section id=\"hero-el\"></section>" },
            "anchor": { "siblingId": "page-head", "side": "after" }
        }))
        .unwrap();

        let Mutation::CreateChild { parent_id, node, anchor } = mutation else {
            panic!("expected createChild");
        };
        assert_eq!(parent_id, "whole-page");
        assert_eq!(node.id, "hero");
        assert!(node.is_html());
        assert_eq!(anchor, Some(Anchor::after("page-head")));
    }

    #[test]
    fn test_update_patch_fields_are_optional() {
        let mutation: Mutation =
            serde_json::from_value(json!({ "action": "updateNode", "nodeId": "hero", "code": "<b></b>" }))
                .unwrap();

        assert_eq!(
            mutation,
            Mutation::UpdateNode {
                node_id: "hero".to_string(),
                description: None,
                code: Some("<b></b>".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: Result<Mutation, _> =
            serde_json::from_value(json!({ "action": "explodeNode", "nodeId": "hero" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_labels() {
        let mutation = Mutation::SwapSiblings {
            first_id: "a".to_string(),
            second_id: "b".to_string(),
        };
        assert_eq!(mutation.label(), "Swap a and b");
        assert_eq!(
            Mutation::DeleteNode { node_id: "hero".to_string() }.label(),
            "Delete hero"
        );
    }
}
