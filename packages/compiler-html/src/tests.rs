use crate::{compile, compile_document, CompileContext, DegradeReason, DEFAULT_FORMS_ENDPOINT};
use pretty_assertions::assert_eq;
use vibe_tree::{Node, Tree, DEFAULT_HEAD, ROOT_ID};

fn page(children: Vec<Node>) -> Tree {
    let root = children
        .into_iter()
        .fold(Node::container(ROOT_ID), Node::with_child);
    Tree::new(root).expect("valid tree")
}

fn body_of(html: &str) -> &str {
    let start = html.find("<body>").expect("body open") + "<body>".len();
    let end = html.find("<script>(function(){").expect("page script");
    &html[start..end]
}

#[test]
fn test_compile_empty_template() {
    let html = compile(&Tree::template(), &CompileContext::anonymous());

    assert_eq!(
        html,
        format!(
            "<!DOCTYPE html><html><head>{DEFAULT_HEAD}<style></style></head><body><script>(function(){{}})();</script></body></html>"
        )
    );
}

#[test]
fn test_compile_css_and_js_function() {
    let tree = page(vec![
        Node::css("styles", "body{color:red}"),
        Node::js_function("helper", "function f(){return 1;}"),
    ]);

    let html = compile(&tree, &CompileContext::anonymous());

    assert!(html.contains("<style>body{color:red}</style>"));
    assert!(html.contains("<script>(function(){function f(){return 1;}})();</script>"));
}

#[test]
fn test_assets_follow_document_order() {
    let tree = page(vec![
        Node::css("base", "a{}"),
        Node::html("hero", "<section id=\"hero-el\"></section>")
            .with_child(Node::css("hero-style", "b{}"))
            .with_child(Node::declaration("state", "let n = 0;")),
        Node::css("blank", "   "),
        Node::javascript("init", "n++;"),
    ]);

    let html = compile(&tree, &CompileContext::anonymous());

    assert!(html.contains("<style>a{}\n\nb{}</style>"));
    assert!(html.contains("<script>(function(){let n = 0;\n\nn++;})();</script>"));
}

#[test]
fn test_head_code_and_default_fallback() {
    let custom = page(vec![Node::head("head", "<title>Mine</title>")]);
    let html = compile(&custom, &CompileContext::anonymous());
    assert!(html.starts_with("<!DOCTYPE html><html><head><title>Mine</title><style>"));

    let blank = page(vec![Node::head("head", "  ")]);
    let html = compile(&blank, &CompileContext::anonymous());
    assert!(html.contains(&format!("<head>{DEFAULT_HEAD}<style>")));
}

#[test]
fn test_html_children_are_nested_and_tagged() {
    let tree = page(vec![
        Node::html("hero", "<section id=\"hero-el\"><p>placeholder</p></section>")
            .with_child(Node::html("title", "<h1>Hi</h1>"))
            .with_child(Node::html("lead", "<p class=\"lead\">Welcome</p>")),
        Node::html("footer", "<footer id=\"footer-el\"></footer>"),
    ]);

    let html = compile(&tree, &CompileContext::anonymous());

    assert_eq!(
        body_of(&html),
        "<section id=\"hero-el\" data-node-id=\"hero\"><h1 data-node-id=\"title\">Hi</h1>\
<p class=\"lead\" data-node-id=\"lead\">Welcome</p></section>\
<footer id=\"footer-el\" data-node-id=\"footer\"></footer>"
    );
}

#[test]
fn test_leaf_keeps_its_inner_content() {
    let tree = page(vec![Node::html("card", "<div><b>kept</b></div>")
        .with_child(Node::css("card-style", ".card{}"))]);

    let document = compile_document(&tree, &CompileContext::anonymous());

    assert_eq!(
        body_of(&document.html),
        "<div data-node-id=\"card\"><b>kept</b></div>"
    );
    assert!(!document.is_degraded());
}

#[test]
fn test_nested_containers_are_transparent() {
    let tree = page(vec![Node::container("main")
        .with_child(Node::html("a", "<p>a</p>"))
        .with_child(Node::container("inner").with_child(Node::html("b", "<p>b</p>")))]);

    let html = compile(&tree, &CompileContext::anonymous());

    assert_eq!(
        body_of(&html),
        "<p data-node-id=\"a\">a</p><p data-node-id=\"b\">b</p>"
    );
}

#[test]
fn test_multiple_roots_degrade_to_concatenation() {
    let tree = page(vec![Node::html("intro", "<h1>A</h1><p>B</p>")
        .with_child(Node::html("extra", "<span>c</span>"))]);

    let document = compile_document(&tree, &CompileContext::anonymous());

    assert_eq!(
        body_of(&document.html),
        "<h1>A</h1><p>B</p><span data-node-id=\"extra\">c</span>"
    );
    assert_eq!(document.degradations.len(), 1);
    assert_eq!(document.degradations[0].node_id, "intro");
    assert_eq!(document.degradations[0].reason, DegradeReason::MultipleRoots);
}

#[test]
fn test_malformed_fragments_never_fail() {
    let tree = page(vec![
        Node::html("broken", "<div><span>unclosed").with_child(Node::html("x", "<i>x</i>")),
        Node::html("text", "just text").with_child(Node::html("y", "<b>y</b>")),
        Node::html("stray", "a < b"),
        Node::html("empty", ""),
    ]);

    let document = compile_document(&tree, &CompileContext::anonymous());

    assert!(document.html.contains("just text<b data-node-id=\"y\">y</b>"));
    assert!(document.html.contains("a < b"));
    assert!(document.html.contains("<div data-node-id=\"broken\"><i data-node-id=\"x\">x</i></div>"));
    assert_eq!(document.degradations[0].node_id, "text");
    assert_eq!(document.degradations[0].reason, DegradeReason::NoElement);
}

#[test]
fn test_raw_document_is_returned_verbatim() {
    let source = "<!DOCTYPE html><html><body><p>imported</p></body></html>";
    let tree = Tree::raw_document(source);

    let html = compile(&tree, &CompileContext::for_project("u1", "p1"));

    assert_eq!(html, source);
}

#[test]
fn test_instrumentation_requires_both_ids() {
    let tree = page(vec![Node::html("form", "<form data-form-id=\"signup\"></form>")]);

    let anonymous = compile(&tree, &CompileContext::anonymous());
    assert!(!anonymous.contains("window.loadData"));

    let partial = CompileContext {
        user_id: Some("u1".to_string()),
        project_id: Some(String::new()),
        forms_endpoint: None,
    };
    assert!(!compile(&tree, &partial).contains("window.loadData"));

    let html = compile(&tree, &CompileContext::for_project("u1", "landing"));
    let block = html.find("window.loadData").expect("instrumentation block");
    let page_script = html.find("<script>(function(){})();").expect("page script");
    assert!(block < page_script);
    assert!(html.contains(&format!("var ENDPOINT = \"{DEFAULT_FORMS_ENDPOINT}\";")));
    assert!(html.ends_with("</body></html>"));
}

#[test]
fn test_forms_endpoint_is_embedded() {
    let tree = page(Vec::new());
    let context =
        CompileContext::for_project("u1", "landing").with_forms_endpoint("https://forms.example/api");

    let html = compile(&tree, &context);

    assert!(html.contains("var ENDPOINT = \"https://forms.example/api\";"));
}

#[test]
fn test_compile_is_deterministic() {
    let tree = page(vec![
        Node::head("head", "<title>T</title>"),
        Node::css("z-style", "z{}"),
        Node::css("a-style", "a{}"),
        Node::html("zeta", "<div id=\"zeta-el\"></div>").with_child(Node::html("alpha", "<p></p>")),
        Node::javascript("js", "console.log(1);"),
    ]);
    let context = CompileContext::for_project("u", "p");

    let first = compile(&tree, &context);
    let second = compile(&tree, &context);

    assert_eq!(first, second);
    assert!(first.contains("<style>z{}\n\na{}</style>"));
}

#[test]
fn test_context_wire_shape() {
    let context: CompileContext =
        serde_json::from_str(r#"{"userId":"u","projectId":"p"}"#).unwrap();
    assert_eq!(context, CompileContext::for_project("u", "p"));
    assert_eq!(
        serde_json::to_string(&CompileContext::anonymous()).unwrap(),
        "{}"
    );
}
