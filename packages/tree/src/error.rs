use crate::node::NodeType;
use thiserror::Error;

pub type TreeResult<T> = Result<T, TreeError>;

/// Errors raised while decoding or validating a tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("JSON error: {0}")]
    Json(String),

    #[error("Invalid node '{id}': {message}")]
    InvalidNode { id: String, message: String },

    #[error("Invalid root: {0}")]
    InvalidRoot(String),

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Node id must not be empty")]
    EmptyId,

    #[error("More than one head node: '{first}' and '{second}'")]
    MultipleHeads { first: String, second: String },

    #[error("Node '{id}' of type {node_type} must not have children")]
    UnexpectedChildren { id: String, node_type: NodeType },

    #[error("raw-html-container '{0}' is only valid as the root")]
    MisplacedRawDocument(String),
}

impl TreeError {
    pub fn invalid_node(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNode {
            id: id.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(e: serde_json::Error) -> Self {
        TreeError::Json(e.to_string())
    }
}
