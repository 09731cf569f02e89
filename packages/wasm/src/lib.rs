use serde_json::json;
use vibe_editor::{
    Anchor, CompileContext, EditSession, MovePosition, Node, NodePatch, PlanReport, Tree,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn context(
    user_id: Option<String>,
    project_id: Option<String>,
    forms_endpoint: Option<String>,
) -> CompileContext {
    let context = match (user_id, project_id) {
        (Some(user), Some(project)) => CompileContext::for_project(user, project),
        _ => CompileContext::anonymous(),
    };
    match forms_endpoint {
        Some(endpoint) => context.with_forms_endpoint(endpoint),
        None => context,
    }
}

fn report_json(report: &PlanReport) -> String {
    let skipped: Vec<_> = report
        .skipped
        .iter()
        .map(|s| json!({ "index": s.index, "label": s.label, "error": s.error.to_string() }))
        .collect();
    json!({ "applied": report.applied, "skipped": skipped }).to_string()
}

/// Editing session over one Vibe Tree
#[wasm_bindgen]
pub struct VibeEditor {
    session: EditSession,
}

#[wasm_bindgen]
impl VibeEditor {
    /// Start from the built-in template
    #[wasm_bindgen(constructor)]
    pub fn new(
        user_id: Option<String>,
        project_id: Option<String>,
        forms_endpoint: Option<String>,
    ) -> Result<VibeEditor, JsValue> {
        let session = EditSession::template(context(user_id, project_id, forms_endpoint))
            .map_err(js_error)?;
        Ok(Self { session })
    }

    /// Open a stored tree
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(
        json: &str,
        user_id: Option<String>,
        project_id: Option<String>,
        forms_endpoint: Option<String>,
    ) -> Result<VibeEditor, JsValue> {
        let tree = Tree::from_json(json).map_err(js_error)?;
        let session = EditSession::new(tree, context(user_id, project_id, forms_endpoint))
            .map_err(js_error)?;
        Ok(Self { session })
    }

    /// `anchor` is `{"siblingId": "...", "side": "before" | "after"}`
    #[wasm_bindgen(js_name = createChild)]
    pub fn create_child(
        &mut self,
        parent_id: &str,
        node_json: &str,
        anchor_json: Option<String>,
    ) -> Result<(), JsValue> {
        let node: Node = serde_json::from_str(node_json).map_err(js_error)?;
        let anchor = anchor_json
            .map(|json| serde_json::from_str::<Anchor>(&json))
            .transpose()
            .map_err(js_error)?;
        self.session
            .create_child(parent_id, node, anchor)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = updateNode)]
    pub fn update_node(
        &mut self,
        node_id: &str,
        description: Option<String>,
        code: Option<String>,
    ) -> Result<(), JsValue> {
        self.session
            .update_node(node_id, NodePatch { description, code })
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = deleteNode)]
    pub fn delete_node(&mut self, node_id: &str) -> Result<(), JsValue> {
        self.session.delete_node(node_id).map_err(js_error)
    }

    /// `position` is `before`, `after` or `inside`
    #[wasm_bindgen(js_name = moveNode)]
    pub fn move_node(
        &mut self,
        source_id: &str,
        target_id: &str,
        position: &str,
    ) -> Result<(), JsValue> {
        let position: MovePosition =
            serde_json::from_value(serde_json::Value::String(position.to_string()))
                .map_err(|_| js_error(format!("Unknown move position '{position}'")))?;
        self.session
            .move_node(source_id, target_id, position)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = swapSiblings)]
    pub fn swap_siblings(&mut self, first_id: &str, second_id: &str) -> Result<(), JsValue> {
        self.session
            .swap_siblings(first_id, second_id)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = replaceTree)]
    pub fn replace_tree(&mut self, tree_json: &str) -> Result<(), JsValue> {
        let tree = Tree::from_json(tree_json).map_err(js_error)?;
        self.session
            .replace_tree(tree.into_root())
            .map_err(js_error)
    }

    /// Apply an AI edit plan; returns `{"applied": [..], "skipped": [..]}`
    #[wasm_bindgen(js_name = applyPlan)]
    pub fn apply_plan(&mut self, plan_json: &str) -> Result<String, JsValue> {
        let report = self.session.apply_plan_json(plan_json).map_err(js_error)?;
        Ok(report_json(&report))
    }

    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.session.undo().map_err(js_error)
    }

    pub fn redo(&mut self) -> Result<bool, JsValue> {
        self.session.redo().map_err(js_error)
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    /// Compiled HTML for the current tree
    pub fn compile(&self) -> String {
        self.session.html().to_string()
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.session.to_json().map_err(js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn version(&self) -> u64 {
        self.session.version()
    }

    #[wasm_bindgen(js_name = setContext)]
    pub fn set_context(
        &mut self,
        user_id: Option<String>,
        project_id: Option<String>,
        forms_endpoint: Option<String>,
    ) {
        self.session
            .set_context(context(user_id, project_id, forms_endpoint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_and_compile() {
        let mut editor = VibeEditor::new(None, None, None).unwrap();

        editor
            .create_child(
                "whole-page",
                r#"{ "id": "hero", "type": "html", "code": "<section id=\"hero-el\"></section>" }"#,
                None,
            )
            .unwrap();
        editor
            .create_child(
                "whole-page",
                r#"{ "id": "intro", "type": "html", "code": "<p>Hi</p>" }"#,
                Some(r#"{ "siblingId": "hero", "side": "before" }"#.to_string()),
            )
            .unwrap();

        assert!(editor.compile().contains(r#"<p data-node-id="intro">Hi</p>"#));
        assert!(editor.can_undo());

        assert!(editor.undo().unwrap());
        assert!(!editor.compile().contains("intro"));
        assert!(editor.can_redo());
    }

    #[test]
    fn test_move_and_swap() {
        let mut editor = VibeEditor::new(None, None, None).unwrap();
        for id in ["a", "b", "c"] {
            let node = format!(r#"{{ "id": "{id}", "type": "html", "code": "<div></div>" }}"#);
            editor.create_child("whole-page", &node, None).unwrap();
        }

        editor.move_node("c", "a", "inside").unwrap();
        editor.swap_siblings("a", "b").unwrap();

        let tree: serde_json::Value = serde_json::from_str(&editor.to_json().unwrap()).unwrap();
        let ids: Vec<_> = tree["children"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.last().map(String::as_str), Some("a"));
        assert_eq!(tree["children"][ids.len() - 1]["children"][0]["id"], "c");
    }

    #[test]
    fn test_apply_plan_reports_skips() {
        let mut editor = VibeEditor::new(Some("u1".into()), Some("landing".into()), None).unwrap();

        let report = editor
            .apply_plan(
                r#"[
                    { "action": "createChild", "parentId": "whole-page",
                      "node": { "id": "hero", "type": "html", "code": "<section></section>" } },
                    { "action": "deleteNode", "nodeId": "ghost" }
                ]"#,
            )
            .unwrap();

        let report: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(report["applied"].as_array().unwrap().len(), 1);
        assert_eq!(report["skipped"][0]["index"], 1);
        assert!(editor.compile().contains("window.loadData"));
    }

    #[test]
    fn test_json_round_trip() {
        let editor = VibeEditor::new(None, None, None).unwrap();
        let json = editor.to_json().unwrap();

        let reopened = VibeEditor::from_json(&json, None, None, None).unwrap();
        assert_eq!(reopened.to_json().unwrap(), json);
        assert_eq!(reopened.compile(), editor.compile());
    }

    #[test]
    fn test_forms_endpoint_reaches_compiled_page() {
        let mut editor = VibeEditor::new(
            Some("u1".into()),
            Some("landing".into()),
            Some("https://forms.example/exec".into()),
        )
        .unwrap();
        assert!(editor
            .compile()
            .contains(r#"var ENDPOINT = "https://forms.example/exec";"#));

        editor.set_context(Some("u1".into()), Some("landing".into()), None);
        assert!(editor.compile().contains(r#"var ENDPOINT = "/api/forms";"#));
    }
}
