//! # Vibe Tree
//!
//! Hierarchical document model for generated websites.
//!
//! ```text
//! whole-page (container)
//! ├── page-head (head)          → <head> contents
//! ├── styles (css)              → concatenated into <style>
//! ├── hero (html)               → #whole-page, beforeend
//! │   └── hero-title (html)     → #hero, beforeend
//! ├── footer (html)             → #hero-el, afterend
//! └── init (js-function)        → concatenated into the page IIFE
//! ```
//!
//! The tree serializes losslessly to plain JSON; that JSON is both the wire
//! format for AI actions and the storage format for every persistence backend.

pub mod attributes;
pub mod error;
pub mod node;
pub mod selectors;
pub mod tree;
pub mod visitor;

pub use error::{TreeError, TreeResult};
pub use node::{Node, NodeKind, NodeType, Position, Walk};
pub use selectors::{recalculate, verify_chain, ChainReport, ChainViolation};
pub use tree::{validate, Tree, DEFAULT_HEAD, ROOT_ID, TEMPLATE_HEAD_ID};
pub use visitor::{walk_node, Visitor};
