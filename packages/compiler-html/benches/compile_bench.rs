use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vibe_compiler_html::{compile, CompileContext};
use vibe_tree::{recalculate, Node, Tree, ROOT_ID};

fn landing_page(sections: usize) -> Tree {
    let mut root = Node::container(ROOT_ID)
        .with_child(Node::head("page-head", "<title>Bench</title>"))
        .with_child(Node::css("base", "body{margin:0;font-family:sans-serif}"));

    for i in 0..sections {
        let section = Node::html(
            format!("section-{i}"),
            format!("<section id=\"section-{i}-el\" class=\"band\"><p>placeholder</p></section>"),
        )
        .with_child(Node::html(format!("title-{i}"), format!("<h2 id=\"title-{i}-el\">Section {i}</h2>")))
        .with_child(Node::html(
            format!("copy-{i}"),
            "<p class=\"copy\">Lorem ipsum dolor sit amet, <a href=\"#\">consectetur</a>.</p>",
        ))
        .with_child(Node::css(format!("style-{i}"), format!(".band:nth-child({i}){{padding:{i}px}}")))
        .with_child(Node::js_function(format!("init-{i}"), format!("function init{i}(){{return {i};}}")));
        root = root.with_child(section);
    }

    recalculate(&mut root);
    for child in root.children.iter_mut() {
        recalculate(child);
    }

    Tree::new(root).expect("valid bench tree")
}

fn compile_small_page(c: &mut Criterion) {
    let tree = landing_page(3);
    let context = CompileContext::anonymous();

    c.bench_function("compile_small_page", |b| {
        b.iter(|| compile(black_box(&tree), black_box(&context)))
    });
}

fn compile_large_page(c: &mut Criterion) {
    let tree = landing_page(100);
    let context = CompileContext::for_project("bench-user", "bench-project");

    c.bench_function("compile_large_page", |b| {
        b.iter(|| compile(black_box(&tree), black_box(&context)))
    });
}

criterion_group!(benches, compile_small_page, compile_large_page);
criterion_main!(benches);
