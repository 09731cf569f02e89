//! # Selector/Position Chain
//!
//! Every sibling group of html nodes forms a singly-linked insertion chain:
//!
//! ```text
//! parent "whole-page"
//!   hero    selector "#whole-page"  position beforeend
//!   about   selector "#hero-el"     position afterend   (id attribute in hero's code)
//!   footer  selector "#about"       position afterend   (about's code has no id)
//! ```
//!
//! The chain is re-derived for one parent after any mutation that changes the
//! membership or order of its html children. Non-html children are skipped.

use crate::attributes::{find_attribute, root_start_tag};
use crate::node::{Node, NodeKind, Position};
use tracing::{debug, warn};

/// Outcome of re-deriving one parent's chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Html children whose placement was rewritten
    pub updated: usize,
    /// Html children whose code had no id attribute; their tree id anchors the next sibling
    pub fallbacks: Vec<String>,
}

/// `id` attribute on the root element of an html payload
pub fn element_id(code: &str) -> Option<&str> {
    let start_tag = root_start_tag(code)?;
    find_attribute(start_tag, "id")?
        .value
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Id the next html sibling attaches after, plus whether the fallback was used
pub fn anchor_id(node: &Node) -> (&str, bool) {
    match element_id(&node.code) {
        Some(id) => (id, false),
        None => (node.id.as_str(), true),
    }
}

/// Re-derive selector/position for every html child of `parent`
pub fn recalculate(parent: &mut Node) -> ChainReport {
    let mut report = ChainReport::default();
    let mut previous_anchor: Option<String> = None;

    for child in parent.children.iter_mut() {
        let NodeKind::Html { selector, position } = &mut child.kind else {
            continue;
        };

        let (expected_selector, expected_position) = match &previous_anchor {
            None => (format!("#{}", parent.id), Position::BeforeEnd),
            Some(anchor) => (format!("#{anchor}"), Position::AfterEnd),
        };

        if *selector != expected_selector || *position != expected_position {
            *selector = expected_selector;
            *position = expected_position;
            report.updated += 1;
        }

        let (anchor, fallback) = anchor_id(child);
        if fallback {
            warn!(node_id = %child.id, "Html node has no id attribute; anchoring next sibling on tree id");
            report.fallbacks.push(child.id.clone());
        }
        previous_anchor = Some(anchor.to_string());
    }

    debug!(
        parent_id = %parent.id,
        updated = report.updated,
        fallbacks = report.fallbacks.len(),
        "Recalculated selector chain"
    );

    report
}

/// A sibling whose placement disagrees with the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainViolation {
    pub node_id: String,
    pub expected_selector: String,
    pub expected_position: Position,
}

/// Check that `parent`'s html children satisfy the chain without modifying them
pub fn verify_chain(parent: &Node) -> Result<(), ChainViolation> {
    let mut previous_anchor: Option<&str> = None;

    for child in &parent.children {
        let NodeKind::Html { selector, position } = &child.kind else {
            continue;
        };

        let (expected_selector, expected_position) = match previous_anchor {
            None => (format!("#{}", parent.id), Position::BeforeEnd),
            Some(anchor) => (format!("#{anchor}"), Position::AfterEnd),
        };

        if *selector != expected_selector || *position != expected_position {
            return Err(ChainViolation {
                node_id: child.id.clone(),
                expected_selector,
                expected_position,
            });
        }

        previous_anchor = Some(anchor_id(child).0);
    }

    Ok(())
}
