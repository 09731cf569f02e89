//! Property tests over arbitrary mutation sequences
//!
//! This tests:
//! - Selector chain integrity after every operation
//! - All-or-nothing failures
//! - Undo/redo inverse law
//! - Cycle rejection for every ancestor/descendant pair
//! - Wire round trip and compile determinism

use proptest::prelude::*;
use vibe_editor::{
    CompileContext, EditSession, EditorError, MovePosition, MutationError, Node, NodePatch, Tree,
};
use vibe_tree::verify_chain;

#[derive(Debug, Clone)]
enum Op {
    Create { parent: usize, kind: u8, with_id: bool },
    Delete(usize),
    Move { source: usize, target: usize, position: u8 },
    Swap(usize, usize),
    Update { node: usize, with_id: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), 0u8..4, any::<bool>())
            .prop_map(|(parent, kind, with_id)| Op::Create { parent, kind, with_id }),
        1 => any::<usize>().prop_map(Op::Delete),
        2 => (any::<usize>(), any::<usize>(), 0u8..3)
            .prop_map(|(source, target, position)| Op::Move { source, target, position }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Swap(a, b)),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(node, with_id)| Op::Update { node, with_id }),
    ]
}

fn pick(session: &EditSession, index: usize) -> String {
    let ids = session.tree().ids();
    ids[index % ids.len()].to_string()
}

fn markup(id: &str, with_id: bool) -> String {
    if with_id {
        format!(r#"<div id="{id}-el" class="block"></div>"#)
    } else {
        "<div class=\"block\"></div>".to_string()
    }
}

fn run(session: &mut EditSession, op: &Op, counter: &mut usize) -> Result<(), EditorError> {
    match op {
        Op::Create {
            parent,
            kind,
            with_id,
        } => {
            *counter += 1;
            let id = format!("n{counter}");
            let node = match kind {
                0 => Node::css(&id, ".block{}"),
                1 => Node::container(&id),
                _ => Node::html(&id, markup(&id, *with_id)),
            };
            let parent = pick(session, *parent);
            session.create_child(&parent, node, None)
        }
        Op::Delete(node) => {
            let id = pick(session, *node);
            session.delete_node(&id)
        }
        Op::Move {
            source,
            target,
            position,
        } => {
            let source = pick(session, *source);
            let target = pick(session, *target);
            let position = match position {
                0 => MovePosition::Before,
                1 => MovePosition::After,
                _ => MovePosition::Inside,
            };
            session.move_node(&source, &target, position)
        }
        Op::Swap(a, b) => {
            let a = pick(session, *a);
            let b = pick(session, *b);
            session.swap_siblings(&a, &b)
        }
        Op::Update { node, with_id } => {
            let id = pick(session, *node);
            session.update_node(&id, NodePatch::code(markup(&format!("{id}-v2"), *with_id)))
        }
    }
}

fn assert_chains(tree: &Tree) -> Result<(), TestCaseError> {
    for node in tree.walk() {
        if node.can_hold_children() {
            prop_assert!(
                verify_chain(node).is_ok(),
                "broken chain under {}: {:?}",
                node.id,
                verify_chain(node)
            );
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn chains_hold_and_failures_change_nothing(ops in prop::collection::vec(op(), 1..40)) {
        let mut session = EditSession::template(CompileContext::anonymous()).unwrap();
        let mut counter = 0;

        for op in &ops {
            let before = session.to_json().unwrap();
            let version = session.version();

            match run(&mut session, op, &mut counter) {
                Ok(()) => assert_chains(session.tree())?,
                Err(_) => {
                    prop_assert_eq!(session.to_json().unwrap(), before);
                    prop_assert_eq!(session.version(), version);
                }
            }
        }
    }

    #[test]
    fn undo_then_redo_is_inverse(ops in prop::collection::vec(op(), 1..30)) {
        let mut session = EditSession::template(CompileContext::anonymous()).unwrap();
        let mut counter = 0;

        for op in &ops {
            let before = session.to_json().unwrap();
            if run(&mut session, op, &mut counter).is_err() {
                continue;
            }
            let after = session.to_json().unwrap();
            if after == before {
                continue;
            }

            prop_assert!(session.undo().unwrap());
            prop_assert_eq!(session.to_json().unwrap(), before);
            prop_assert!(session.redo().unwrap());
            prop_assert_eq!(session.to_json().unwrap(), after);
        }
    }

    #[test]
    fn moves_into_own_subtree_are_rejected(ops in prop::collection::vec(op(), 1..30)) {
        let mut session = EditSession::template(CompileContext::anonymous()).unwrap();
        let mut counter = 0;
        for op in &ops {
            let _ = run(&mut session, op, &mut counter);
        }

        let ids: Vec<String> = session.tree().ids().into_iter().map(str::to_string).collect();
        let before = session.to_json().unwrap();

        for ancestor in &ids {
            for id in &ids {
                if ancestor != id && !session.tree().is_descendant(ancestor, id) {
                    continue;
                }
                let result = session.move_node(ancestor, id, MovePosition::Inside);
                prop_assert!(
                    matches!(result, Err(EditorError::Mutation(MutationError::CyclicMove { .. }))),
                    "moving {} into {} gave {:?}",
                    ancestor,
                    id,
                    result
                );
            }
        }

        prop_assert_eq!(session.to_json().unwrap(), before);
    }

    #[test]
    fn round_trip_and_deterministic_compile(ops in prop::collection::vec(op(), 1..30)) {
        let mut session = EditSession::template(CompileContext::for_project("u", "p")).unwrap();
        let mut counter = 0;
        for op in &ops {
            let _ = run(&mut session, op, &mut counter);
        }

        let json = session.to_json().unwrap();
        let restored = Tree::from_json(&json).unwrap();
        prop_assert_eq!(&restored, session.tree());

        let context = CompileContext::for_project("u", "p");
        let first = vibe_compiler_html::compile(&restored, &context);
        let second = vibe_compiler_html::compile(session.tree(), &context);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.as_str(), session.html());
    }
}
