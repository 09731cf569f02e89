//! Integration tests for editor crate

use pretty_assertions::assert_eq;
use serde_json::Value;
use vibe_editor::{
    ChangeKind, CompileContext, EditSession, EditorError, MovePosition, MutationError, Node,
    NodePatch, Position, SessionChange, SessionObserver, Tree,
};
use std::cell::RefCell;
use std::rc::Rc;

fn placement<'a>(session: &'a EditSession, id: &str) -> (&'a str, Position) {
    let node = session.tree().find(id).expect("node exists");
    (node.selector().expect("html node"), node.position().expect("html node"))
}

fn hero() -> Node {
    Node::html("hero", r#"<section id="hero-el"></section>"#)
}

fn footer() -> Node {
    Node::html("footer", r#"<footer id="footer-el"></footer>"#)
}

fn canonical(json: &str) -> Value {
    serde_json::from_str(json).expect("valid json")
}

#[test]
fn test_first_child_attaches_inside_root() {
    let mut session = EditSession::template(CompileContext::anonymous()).unwrap();

    session.create_child("whole-page", hero(), None).unwrap();

    assert_eq!(placement(&session, "hero"), ("#whole-page", Position::BeforeEnd));
}

#[test]
fn test_second_child_attaches_after_first_element() {
    let mut session = EditSession::template(CompileContext::anonymous()).unwrap();

    session.create_child("whole-page", hero(), None).unwrap();
    session.create_child("whole-page", footer(), None).unwrap();

    assert_eq!(placement(&session, "footer"), ("#hero-el", Position::AfterEnd));
}

#[test]
fn test_delete_repairs_chain() {
    let mut session = EditSession::template(CompileContext::anonymous()).unwrap();
    session.create_child("whole-page", hero(), None).unwrap();
    session.create_child("whole-page", footer(), None).unwrap();

    session.delete_node("hero").unwrap();

    assert_eq!(placement(&session, "footer"), ("#whole-page", Position::BeforeEnd));
}

#[test]
fn test_compile_css_and_function() {
    let mut session = EditSession::template(CompileContext::anonymous()).unwrap();
    session
        .create_child("whole-page", Node::css("styles", "body{color:red}"), None)
        .unwrap();
    session
        .create_child("whole-page", Node::js_function("f", "function f(){return 1;}"), None)
        .unwrap();

    let html = session.html();

    assert!(html.contains("<style>body{color:red}</style>"));
    assert!(html.contains("<script>(function(){function f(){return 1;}})();</script>"));
}

#[test]
fn test_cyclic_move_leaves_tree_unchanged() {
    let mut session = EditSession::template(CompileContext::anonymous()).unwrap();
    session.create_child("whole-page", hero(), None).unwrap();
    session.create_child("whole-page", footer(), None).unwrap();

    session
        .move_node("footer", "hero", MovePosition::Inside)
        .unwrap();
    assert_eq!(
        session.tree().parent_of("footer").map(|p| p.id.as_str()),
        Some("hero")
    );
    assert_eq!(placement(&session, "footer"), ("#hero", Position::BeforeEnd));

    let before = session.to_json().unwrap();
    let version = session.version();
    let levels = session.history().undo_levels();

    let result = session.move_node("hero", "footer", MovePosition::Inside);

    assert!(matches!(
        result,
        Err(EditorError::Mutation(MutationError::CyclicMove { .. }))
    ));
    assert_eq!(session.to_json().unwrap(), before);
    assert_eq!(session.version(), version);
    assert_eq!(session.history().undo_levels(), levels);
}

#[test]
fn test_undo_restores_pre_mutation_snapshot() {
    let mut session = EditSession::template(CompileContext::anonymous()).unwrap();
    session.create_child("whole-page", hero(), None).unwrap();

    let snapshot = session.to_json().unwrap();
    session.record("Before update").unwrap();
    session
        .update_node("hero", NodePatch::code(r#"<section id="banner"></section>"#))
        .unwrap();
    assert_ne!(session.to_json().unwrap(), snapshot);

    assert!(session.undo().unwrap());

    assert_eq!(canonical(&session.to_json().unwrap()), canonical(&snapshot));
    assert_eq!(session.to_json().unwrap(), snapshot);
}

#[test]
fn test_unknown_fields_survive_editing() {
    let json = r##"{
        "id": "whole-page", "type": "container", "description": "", "code": "",
        "theme": "dark",
        "children": [
            { "id": "hero", "type": "html", "description": "", "code": "<section id=\"hero-el\"></section>",
              "selector": "#whole-page", "position": "beforeend", "children": [], "aiModel": "v2" }
        ]
    }"##;
    let tree = Tree::from_json(json).unwrap();
    let mut session = EditSession::new(tree, CompileContext::anonymous()).unwrap();

    session.create_child("whole-page", footer(), None).unwrap();

    let saved = canonical(&session.to_json().unwrap());
    assert_eq!(saved["theme"], "dark");
    assert_eq!(saved["children"][0]["aiModel"], "v2");
    assert_eq!(saved["children"][1]["selector"], "#hero-el");
}

#[test]
fn test_observer_sees_compiled_html() {
    #[derive(Clone, Default)]
    struct Preview {
        frames: Rc<RefCell<Vec<String>>>,
    }

    impl SessionObserver for Preview {
        fn on_change(&self, change: &SessionChange<'_>) {
            if change.kind != ChangeKind::Context {
                self.frames.borrow_mut().push(change.html.to_string());
            }
        }
    }

    let mut session = EditSession::template(CompileContext::for_project("u1", "landing")).unwrap();
    let preview = Preview::default();
    session.add_observer(Box::new(preview.clone()));

    session.create_child("whole-page", hero(), None).unwrap();
    session.undo().unwrap();

    let frames = preview.frames.borrow();
    assert_eq!(frames.len(), 2);
    assert!(frames[0].contains(r#"data-node-id="hero""#));
    assert!(frames[0].contains("window.loadData"));
    assert!(!frames[1].contains(r#"data-node-id="hero""#));
}

#[test]
fn test_ai_plan_lifecycle() {
    let mut session = EditSession::template(CompileContext::anonymous()).unwrap();

    let report = session
        .apply_plan_json(
            r#"{ "label": "Add landing sections", "actions": [
                { "action": "createChild", "parentId": "whole-page", "node": { "id": "hero", "type": "html", "code": "<section id=\"hero-el\"></section>" } },
                { "action": "createChild", "parentId": "whole-page", "node": { "id": "hero", "type": "html", "code": "<div></div>" } },
                { "action": "createChild", "parentId": "hero", "node": { "id": "title", "type": "html", "code": "<h1>Hi</h1>" } },
                { "action": "updateNode", "nodeId": "whole-page", "description": "Landing page" }
            ] }"#,
        )
        .unwrap();

    assert_eq!(report.applied.len(), 3);
    assert_eq!(
        report.skipped[0].error,
        MutationError::DuplicateId("hero".to_string())
    );
    assert_eq!(session.history().undo_label(), Some("Add landing sections"));
    assert!(session.html().contains(
        r#"<section id="hero-el" data-node-id="hero"><h1 data-node-id="title">Hi</h1></section>"#
    ));

    let rejected = session.apply_plan_json(r#"{ "actions": [ { "action": "deleteNode" } ] }"#);
    assert!(matches!(rejected, Err(EditorError::InvalidPlan(_))));
    assert_eq!(session.history().undo_levels(), 1);
}
