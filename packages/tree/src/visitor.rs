use crate::node::{Node, NodeKind, Position};

/// Visitor pattern for traversing a Vibe Tree immutably
///
/// `visit_node` dispatches on the node kind and then walks the children in
/// order. Override the per-kind hooks to collect what you need; override
/// `visit_node` itself to stop descent.
pub trait Visitor: Sized {
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_container(&mut self, _node: &Node) {}

    fn visit_head(&mut self, _node: &Node) {}

    fn visit_html(&mut self, _node: &Node, _selector: &str, _position: Position) {}

    fn visit_style(&mut self, _node: &Node) {}

    /// javascript, js-function and declaration nodes
    fn visit_script(&mut self, _node: &Node) {}

    fn visit_raw_document(&mut self, _node: &Node) {}
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &Node) {
    match &node.kind {
        NodeKind::Container => visitor.visit_container(node),
        NodeKind::Head => visitor.visit_head(node),
        NodeKind::Html { selector, position } => visitor.visit_html(node, selector, *position),
        NodeKind::Css => visitor.visit_style(node),
        NodeKind::Javascript | NodeKind::JsFunction | NodeKind::Declaration => {
            visitor.visit_script(node)
        }
        NodeKind::RawHtmlContainer => visitor.visit_raw_document(node),
    }

    for child in &node.children {
        visitor.visit_node(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct KindCounter {
        html: usize,
        scripts: usize,
        styles: usize,
    }

    impl Visitor for KindCounter {
        fn visit_html(&mut self, _node: &Node, _selector: &str, _position: Position) {
            self.html += 1;
        }

        fn visit_style(&mut self, _node: &Node) {
            self.styles += 1;
        }

        fn visit_script(&mut self, _node: &Node) {
            self.scripts += 1;
        }
    }

    #[test]
    fn test_visitor_reaches_nested_nodes() {
        let root = Node::container("whole-page")
            .with_child(
                Node::html("hero", "<section></section>")
                    .with_child(Node::css("hero-style", ".hero{}"))
                    .with_child(Node::js_function("hero-init", "function init(){}")),
            )
            .with_child(Node::declaration("state", "let count = 0;"));

        let mut counter = KindCounter::default();
        counter.visit_node(&root);

        assert_eq!(counter.html, 1);
        assert_eq!(counter.styles, 1);
        assert_eq!(counter.scripts, 2);
    }
}
