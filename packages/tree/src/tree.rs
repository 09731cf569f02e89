//! # Tree Handle
//!
//! Owns the root node and guarantees the structural invariants on
//! construction: a `whole-page` container root (or the raw-html-container
//! sentinel), globally unique ids and at most one head node.

use crate::error::{TreeError, TreeResult};
use crate::node::{Node, NodeKind, NodeType, Walk};
use crate::visitor::{walk_node, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;

/// Id of the structured root container
pub const ROOT_ID: &str = "whole-page";

/// Id of the head node created by the built-in template
pub const TEMPLATE_HEAD_ID: &str = "page-head";

/// Head contents used when the tree has no head node
pub const DEFAULT_HEAD: &str = "<meta charset=\"UTF-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\
<title>Vibe Coded Website</title>";

/// A validated Vibe Tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Node")]
pub struct Tree {
    root: Node,
}

impl Tree {
    /// Validate and wrap a root node
    pub fn new(root: Node) -> TreeResult<Self> {
        validate(&root)?;
        Ok(Self { root })
    }

    /// Built-in starting point: an empty page with the default head
    pub fn template() -> Self {
        let head = Node::head(TEMPLATE_HEAD_ID, DEFAULT_HEAD)
            .with_description("Document head: charset, viewport and title");
        let root = Node::container(ROOT_ID)
            .with_description("Whole page")
            .with_child(head);
        Self { root }
    }

    /// Unstructured tree wrapping an imported document verbatim
    pub fn raw_document(html: impl Into<String>) -> Self {
        let root = Node::new(ROOT_ID, NodeKind::RawHtmlContainer)
            .with_description("Imported document")
            .with_code(html);
        Self { root }
    }

    /// Parse and validate; structural violations keep their specific variant
    pub fn from_json(json: &str) -> TreeResult<Self> {
        let root: Node = serde_json::from_str(json)?;
        Self::new(root)
    }

    pub fn from_value(value: serde_json::Value) -> TreeResult<Self> {
        let root: Node = serde_json::from_value(value)?;
        Self::new(root)
    }

    pub fn to_json(&self) -> TreeResult<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    pub fn to_json_pretty(&self) -> TreeResult<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutable root access; callers must restore the invariants before returning control
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// False while the raw-html-container sentinel is the root
    pub fn is_structured(&self) -> bool {
        !matches!(self.root.kind, NodeKind::RawHtmlContainer)
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        self.root.parent_of(id)
    }

    pub fn parent_of_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.root.parent_of_mut(id)
    }

    /// True when `id` sits strictly below `ancestor_id`
    pub fn is_descendant(&self, ancestor_id: &str, id: &str) -> bool {
        self.find(ancestor_id)
            .map(|ancestor| ancestor.children.iter().any(|child| child.find(id).is_some()))
            .unwrap_or(false)
    }

    pub fn head(&self) -> Option<&Node> {
        self.walk().find(|node| matches!(node.kind, NodeKind::Head))
    }

    pub fn walk(&self) -> Walk<'_> {
        self.root.walk()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.walk().map(|node| node.id.as_str()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.walk().count()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::template()
    }
}

impl TryFrom<Node> for Tree {
    type Error = TreeError;

    fn try_from(root: Node) -> Result<Self, Self::Error> {
        Tree::new(root)
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

/// Check the structural invariants of a candidate root
pub fn validate(root: &Node) -> TreeResult<()> {
    match root.kind {
        NodeKind::Container if root.id == ROOT_ID => {}
        NodeKind::Container => {
            return Err(TreeError::InvalidRoot(format!(
                "root container must have id '{ROOT_ID}', found '{}'",
                root.id
            )))
        }
        NodeKind::RawHtmlContainer => {}
        ref other => {
            return Err(TreeError::InvalidRoot(format!(
                "root must be a container or raw-html-container, found {}",
                other.node_type()
            )))
        }
    }

    let mut validator = Validator {
        root_id: root.id.clone(),
        seen: HashSet::new(),
        head: None,
        error: None,
    };
    validator.visit_node(root);

    match validator.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

struct Validator {
    root_id: String,
    seen: HashSet<String>,
    head: Option<String>,
    error: Option<TreeError>,
}

impl Validator {
    fn check_identity(&mut self, node: &Node) -> TreeResult<()> {
        if node.id.is_empty() {
            return Err(TreeError::EmptyId);
        }
        if !self.seen.insert(node.id.clone()) {
            return Err(TreeError::DuplicateId(node.id.clone()));
        }
        Ok(())
    }
}

impl Visitor for Validator {
    fn visit_node(&mut self, node: &Node) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.check_identity(node) {
            self.error = Some(error);
            return;
        }
        if !node.children.is_empty() && !node.can_hold_children() {
            self.error = Some(TreeError::UnexpectedChildren {
                id: node.id.clone(),
                node_type: node.node_type(),
            });
            return;
        }
        walk_node(self, node);
    }

    fn visit_head(&mut self, node: &Node) {
        match &self.head {
            Some(first) => {
                self.error.get_or_insert(TreeError::MultipleHeads {
                    first: first.clone(),
                    second: node.id.clone(),
                });
            }
            None => self.head = Some(node.id.clone()),
        }
    }

    fn visit_raw_document(&mut self, node: &Node) {
        if node.id != self.root_id || !node.children.is_empty() {
            let error = if node.children.is_empty() {
                TreeError::MisplacedRawDocument(node.id.clone())
            } else {
                TreeError::UnexpectedChildren {
                    id: node.id.clone(),
                    node_type: NodeType::RawHtmlContainer,
                }
            };
            self.error.get_or_insert(error);
        }
    }
}
