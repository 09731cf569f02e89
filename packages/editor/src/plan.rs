//! AI action plans.
//!
//! A plan is parsed in full before anything is applied: a response that is not
//! a valid plan changes nothing. Inside a valid plan each action is applied in
//! order, and an action that fails validation is skipped without aborting the
//! ones after it.

use crate::document::Document;
use crate::errors::EditorError;
use crate::mutations::{Mutation, MutationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Ordered mutation batch produced by an AI backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// History label for the whole batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub actions: Vec<Mutation>,
}

/// An action that did not apply
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAction {
    pub index: usize,
    pub label: String,
    pub error: MutationError,
}

/// Outcome of applying a plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanReport {
    /// Labels of the actions that applied, in order
    pub applied: Vec<String>,
    pub skipped: Vec<SkippedAction>,
}

impl PlanReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl Plan {
    pub fn new(actions: Vec<Mutation>) -> Self {
        Self {
            label: None,
            actions,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Parse `{"actions": [...]}` or a bare action array
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| EditorError::InvalidPlan(e.to_string()))?;

        match value {
            Value::Array(_) => serde_json::from_value::<Vec<Mutation>>(value)
                .map(Plan::new)
                .map_err(|e| EditorError::InvalidPlan(e.to_string())),
            Value::Object(_) => serde_json::from_value::<Plan>(value)
                .map_err(|e| EditorError::InvalidPlan(e.to_string())),
            other => Err(EditorError::InvalidPlan(format!(
                "expected an object or an array of actions, found {other}"
            ))),
        }
    }

    pub fn label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("Apply plan ({} actions)", self.actions.len()),
        }
    }

    /// Apply every valid action in order
    pub fn apply(&self, document: &mut Document) -> PlanReport {
        let mut report = PlanReport::default();

        for (index, action) in self.actions.iter().enumerate() {
            let label = action.label();
            match action.apply(document) {
                Ok(()) => {
                    debug!(index, action = %label, "Applied plan action");
                    report.applied.push(label);
                }
                Err(error) => {
                    warn!(index, action = %label, %error, "Skipping plan action");
                    report.skipped.push(SkippedAction {
                        index,
                        label,
                        error,
                    });
                }
            }
        }

        report
    }
}
