//! # Vibe Tree Nodes
//!
//! A node is the atomic unit of a generated website. Its `kind` decides how the
//! compiler treats the `code` payload and which mutations are legal on it.
//!
//! ## Wire format
//!
//! ```text
//! {
//!   "id": "hero",
//!   "type": "html",
//!   "description": "Landing hero",
//!   "code": "<section id=\"hero-el\"></section>",
//!   "selector": "#whole-page",
//!   "position": "beforeend",
//!   "children": []
//! }
//! ```
//!
//! `selector`/`position` only exist on `html` nodes. Any other field is kept in
//! [`Node::extra`] and written back untouched.

use crate::error::TreeError;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Insertion point of an html node relative to its selector target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    /// Append inside the selector target
    #[serde(rename = "beforeend")]
    BeforeEnd,
    /// Insert immediately after the selector target
    #[serde(rename = "afterend")]
    AfterEnd,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::BeforeEnd => "beforeend",
            Position::AfterEnd => "afterend",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain type tag, as it appears in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Container,
    Head,
    Html,
    Css,
    Javascript,
    JsFunction,
    Declaration,
    RawHtmlContainer,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Container => "container",
            NodeType::Head => "head",
            NodeType::Html => "html",
            NodeType::Css => "css",
            NodeType::Javascript => "javascript",
            NodeType::JsFunction => "js-function",
            NodeType::Declaration => "declaration",
            NodeType::RawHtmlContainer => "raw-html-container",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    Head,
    Html { selector: String, position: Position },
    Css,
    Javascript,
    JsFunction,
    Declaration,
    RawHtmlContainer,
}

impl NodeKind {
    /// Html kind with an unresolved placement (fixed by the next chain recalculation)
    pub fn html() -> Self {
        NodeKind::Html {
            selector: String::new(),
            position: Position::BeforeEnd,
        }
    }

    pub fn from_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Container => NodeKind::Container,
            NodeType::Head => NodeKind::Head,
            NodeType::Html => NodeKind::html(),
            NodeType::Css => NodeKind::Css,
            NodeType::Javascript => NodeKind::Javascript,
            NodeType::JsFunction => NodeKind::JsFunction,
            NodeType::Declaration => NodeKind::Declaration,
            NodeType::RawHtmlContainer => NodeKind::RawHtmlContainer,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Container => NodeType::Container,
            NodeKind::Head => NodeType::Head,
            NodeKind::Html { .. } => NodeType::Html,
            NodeKind::Css => NodeType::Css,
            NodeKind::Javascript => NodeType::Javascript,
            NodeKind::JsFunction => NodeType::JsFunction,
            NodeKind::Declaration => NodeType::Declaration,
            NodeKind::RawHtmlContainer => NodeType::RawHtmlContainer,
        }
    }

    /// Script-bearing kinds, concatenated into the page IIFE
    pub fn is_script(&self) -> bool {
        matches!(
            self,
            NodeKind::Javascript | NodeKind::JsFunction | NodeKind::Declaration
        )
    }
}

/// One element of the Vibe Tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireNode")]
pub struct Node {
    /// Globally unique, kebab-case identity
    pub id: String,
    pub kind: NodeKind,
    pub description: String,
    pub code: String,
    /// Rendering order
    pub children: Vec<Node>,
    /// Unknown wire fields, preserved on re-save
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            description: String::new(),
            code: String::new(),
            children: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn container(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Container)
    }

    pub fn head(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Head).with_code(code)
    }

    pub fn html(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, NodeKind::html()).with_code(code)
    }

    pub fn css(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Css).with_code(code)
    }

    pub fn javascript(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Javascript).with_code(code)
    }

    pub fn js_function(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, NodeKind::JsFunction).with_code(code)
    }

    pub fn declaration(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Declaration).with_code(code)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is_html(&self) -> bool {
        matches!(self.kind, NodeKind::Html { .. })
    }

    /// Only containers and html nodes hold children
    pub fn can_hold_children(&self) -> bool {
        matches!(self.kind, NodeKind::Container | NodeKind::Html { .. })
    }

    pub fn selector(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Html { selector, .. } => Some(selector),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match &self.kind {
            NodeKind::Html { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Find the node whose direct children include `child_id`
    pub fn parent_of(&self, child_id: &str) -> Option<&Node> {
        if self.children.iter().any(|c| c.id == child_id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.parent_of(child_id))
    }

    pub fn parent_of_mut(&mut self, child_id: &str) -> Option<&mut Node> {
        if self.children.iter().any(|c| c.id == child_id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.parent_of_mut(child_id))
    }

    pub fn child_index(&self, child_id: &str) -> Option<usize> {
        self.children.iter().position(|c| c.id == child_id)
    }

    /// Pre-order traversal in children-array order
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Pre-order iterator over a subtree
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Deserialize)]
struct WireNode {
    id: String,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    selector: Option<Value>,
    #[serde(default)]
    position: Option<Value>,
    #[serde(default)]
    children: Option<Vec<Node>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<WireNode> for Node {
    type Error = TreeError;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        let WireNode {
            id,
            node_type,
            description,
            code,
            selector,
            position,
            children,
            mut extra,
        } = wire;

        let kind = match node_type {
            NodeType::Html => {
                let selector = match selector {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s,
                    Some(other) => {
                        return Err(TreeError::invalid_node(
                            id,
                            format!("selector must be a string, found {other}"),
                        ))
                    }
                };
                let position = match position {
                    None | Some(Value::Null) => Position::BeforeEnd,
                    Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
                        TreeError::invalid_node(id.clone(), format!("unknown position {value}"))
                    })?,
                };
                NodeKind::Html { selector, position }
            }
            other => {
                // Placement fields on non-html nodes are foreign data
                if let Some(selector) = selector {
                    extra.insert("selector".to_string(), selector);
                }
                if let Some(position) = position {
                    extra.insert("position".to_string(), position);
                }
                NodeKind::from_type(other)
            }
        };

        Ok(Node {
            id,
            kind,
            description: description.unwrap_or_default(),
            code: code.unwrap_or_default(),
            children: children.unwrap_or_default(),
            extra,
        })
    }
}

#[derive(Serialize)]
struct WireNodeRef<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    node_type: NodeType,
    description: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    children: &'a [Node],
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireNodeRef {
            id: &self.id,
            node_type: self.node_type(),
            description: &self.description,
            code: &self.code,
            selector: self.selector(),
            position: self.position(),
            children: &self.children,
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}
