//! Form-capture block embedded in documents compiled for a known user/project.
//!
//! The block intercepts `submit` on any element carrying `data-form-id`,
//! posts `{ action, userId, projectId, formId, timestamp, data }` to the forms
//! endpoint, and exposes `window.loadData(formId)` resolving to
//! `Array<{ timestamp, data }>`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Attribute marking a form whose submissions are captured
pub const FORM_ATTRIBUTE: &str = "data-form-id";

/// Endpoint used when the context does not name one
pub const DEFAULT_FORMS_ENDPOINT: &str = "/api/forms";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(USER_ID|PROJECT_ID|ENDPOINT|FORM_ATTRIBUTE)__").unwrap());

const FORM_CAPTURE_TEMPLATE: &str = r#"<script>
(function(){
  var USER_ID = __USER_ID__;
  var PROJECT_ID = __PROJECT_ID__;
  var ENDPOINT = __ENDPOINT__;
  var FORM_ATTRIBUTE = __FORM_ATTRIBUTE__;
  function collect(form){
    var data = {};
    new FormData(form).forEach(function(value, key){ data[key] = value; });
    return data;
  }
  document.addEventListener('submit', function(event){
    var form = event.target && event.target.closest ? event.target.closest('[' + FORM_ATTRIBUTE + ']') : null;
    if (!form) return;
    event.preventDefault();
    var record = {
      action: 'saveFormData',
      userId: USER_ID,
      projectId: PROJECT_ID,
      formId: form.getAttribute(FORM_ATTRIBUTE),
      timestamp: new Date().toISOString(),
      data: collect(form)
    };
    fetch(ENDPOINT, { method: 'POST', headers: { 'Content-Type': 'text/plain;charset=utf-8' }, body: JSON.stringify(record) })
      .then(function(){ form.dispatchEvent(new CustomEvent('vibe:form-saved', { bubbles: true, detail: record })); })
      .catch(function(error){ console.error('Form submission failed', error); });
  }, true);
  window.loadData = function(formId){
    var url = ENDPOINT
      + (ENDPOINT.indexOf('?') === -1 ? '?' : '&') + 'action=loadFormData'
      + '&userId=' + encodeURIComponent(USER_ID)
      + '&projectId=' + encodeURIComponent(PROJECT_ID)
      + '&formId=' + encodeURIComponent(formId);
    return fetch(url)
      .then(function(response){ return response.json(); })
      .then(function(body){ return (body && body.data) || []; });
  };
})();
</script>"#;

/// Render the form-capture block for one user/project pair
pub fn form_capture_block(user_id: &str, project_id: &str, endpoint: &str) -> String {
    // One pass, so substituted values are never rescanned
    PLACEHOLDER
        .replace_all(FORM_CAPTURE_TEMPLATE, |caps: &Captures<'_>| match &caps[1] {
            "USER_ID" => js_string(user_id),
            "PROJECT_ID" => js_string(project_id),
            "ENDPOINT" => js_string(endpoint),
            _ => js_string(FORM_ATTRIBUTE),
        })
        .into_owned()
}

/// JSON string literal that cannot terminate the surrounding script element
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}
