use crate::fragment::{DegradeReason, Fragment};
use crate::instrumentation::{form_capture_block, DEFAULT_FORMS_ENDPOINT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use vibe_tree::{Node, NodeKind, Tree, Visitor, DEFAULT_HEAD};

/// Who the document is compiled for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Endpoint the form-capture block talks to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forms_endpoint: Option<String>,
}

impl CompileContext {
    /// Context without instrumentation
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_project(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            project_id: Some(project_id.into()),
            forms_endpoint: None,
        }
    }

    pub fn with_forms_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.forms_endpoint = Some(endpoint.into());
        self
    }

    /// Both ids, when instrumentation applies
    fn instrumented(&self) -> Option<(&str, &str)> {
        match (self.user_id.as_deref(), self.project_id.as_deref()) {
            (Some(user), Some(project)) if !user.is_empty() && !project.is_empty() => {
                Some((user, project))
            }
            _ => None,
        }
    }
}

/// A fragment that had children appended instead of nested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub node_id: String,
    pub reason: DegradeReason,
}

/// Compiled document plus the soft degradation signals raised on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    pub html: String,
    pub degradations: Vec<Degradation>,
}

impl CompiledDocument {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Compile a tree into one self-contained HTML document
pub fn compile(tree: &Tree, context: &CompileContext) -> String {
    compile_document(tree, context).html
}

/// Compile and report every fragment that could not be nested
#[instrument(skip(tree, context), fields(nodes = tree.node_count(), structured = tree.is_structured()))]
pub fn compile_document(tree: &Tree, context: &CompileContext) -> CompiledDocument {
    if !tree.is_structured() {
        debug!("Raw document root; returning code verbatim");
        return CompiledDocument {
            html: tree.root().code.clone(),
            degradations: Vec::new(),
        };
    }

    let mut assets = Assets::default();
    assets.visit_node(tree.root());

    let mut pass = HtmlPass::default();
    let body = pass.render_children(tree.root());

    let head = match assets.head.as_deref() {
        Some(code) if !code.trim().is_empty() => code,
        _ => DEFAULT_HEAD,
    };
    let css = assets.styles.join("\n\n");
    let js = assets.scripts.join("\n\n");

    let instrumentation = match context.instrumented() {
        Some((user_id, project_id)) => {
            let endpoint = context
                .forms_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_FORMS_ENDPOINT);
            form_capture_block(user_id, project_id, endpoint)
        }
        None => String::new(),
    };

    let html = format!(
        "<!DOCTYPE html><html><head>{head}<style>{css}</style></head><body>{body}{instrumentation}<script>(function(){{{js}}})();</script></body></html>"
    );

    info!(
        styles = assets.styles.len(),
        scripts = assets.scripts.len(),
        degraded = pass.degradations.len(),
        bytes = html.len(),
        "Compiled document"
    );

    CompiledDocument {
        html,
        degradations: pass.degradations,
    }
}

/// Head, css and script payloads in document order
#[derive(Default)]
struct Assets {
    head: Option<String>,
    styles: Vec<String>,
    scripts: Vec<String>,
}

impl Visitor for Assets {
    fn visit_head(&mut self, node: &Node) {
        if self.head.is_none() {
            self.head = Some(node.code.clone());
        }
    }

    fn visit_style(&mut self, node: &Node) {
        push_payload(&mut self.styles, &node.code);
    }

    fn visit_script(&mut self, node: &Node) {
        push_payload(&mut self.scripts, &node.code);
    }
}

fn push_payload(target: &mut Vec<String>, code: &str) {
    if !code.trim().is_empty() {
        target.push(code.to_string());
    }
}

#[derive(Default)]
struct HtmlPass {
    degradations: Vec<Degradation>,
}

impl HtmlPass {
    /// Markup of the html children of `parent`; nested containers are transparent
    fn render_children(&mut self, parent: &Node) -> String {
        let mut out = String::new();
        for child in &parent.children {
            match child.kind {
                NodeKind::Html { .. } => out.push_str(&self.render_html(child)),
                NodeKind::Container => out.push_str(&self.render_children(child)),
                _ => {}
            }
        }
        out
    }

    fn render_html(&mut self, node: &Node) -> String {
        let fragment = Fragment::parse(&node.code);

        if !has_markup_children(node) {
            return fragment.tag(&node.id);
        }

        let children = self.render_children(node);
        let rendered = fragment.nest(&node.id, &children);

        if let Some(reason) = rendered.degraded {
            debug!(node_id = %node.id, reason = reason.describe(), "Appending children after fragment");
            self.degradations.push(Degradation {
                node_id: node.id.clone(),
                reason,
            });
        }

        rendered.html
    }
}

fn has_markup_children(node: &Node) -> bool {
    node.children.iter().any(|child| match child.kind {
        NodeKind::Html { .. } => true,
        NodeKind::Container => has_markup_children(child),
        _ => false,
    })
}
