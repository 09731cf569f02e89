//! Cloud endpoint backend
//!
//! Talks to a single JSON endpoint (a spreadsheet script, a serverless
//! function) that multiplexes every operation through one POST:
//!
//! ```json
//! { "action": "save", "scopeId": "u1", "projectId": "landing", "tree": { ... } }
//! ```
//!
//! and answers with
//!
//! ```json
//! { "status": "success", "tree": { ... }, "projects": ["landing"], "message": "..." }
//! ```
//!
//! `status` is one of `success`, `not_found` or `error`.

use crate::adapter::{
    check_key, check_project_key, PersistenceAdapter, StorageError, StorageErrorKind, StorageResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use ureq::Agent;
use vibe_tree::Tree;

const BACKEND: &str = "Http";

/// Default timeout for HTTP requests in seconds.
pub(crate) const DEFAULT_TIMEOUT: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
enum Action {
    Save,
    Load,
    List,
    Delete,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    action: Action,
    scope_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReplyStatus {
    Success,
    NotFound,
    Error,
}

#[derive(Debug, Deserialize)]
struct Reply {
    status: ReplyStatus,
    #[serde(default)]
    tree: Option<Value>,
    #[serde(default)]
    projects: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
}

impl Reply {
    fn into_success(self, request: &Request) -> StorageResult<Self> {
        let project = request.project_id.as_deref().unwrap_or_default();
        match self.status {
            ReplyStatus::Success => Ok(self),
            ReplyStatus::NotFound => Err(StorageError::not_found(&request.scope_id, project)
                .with_backend(BACKEND)),
            ReplyStatus::Error => {
                let mut err = StorageError::new(StorageErrorKind::Other)
                    .with_backend(BACKEND)
                    .with_key(&request.scope_id, project);
                if let Some(message) = self.message {
                    err = err.with_message(message);
                }
                Err(err)
            }
        }
    }
}

/// Persistence through a remote JSON endpoint
#[derive(Debug, Clone)]
pub struct HttpStorage {
    agent: Agent,
    endpoint: String,
}

impl HttpStorage {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            agent: default_agent(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, request: Request) -> StorageResult<Reply> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();

        blocking(move || {
            let response = agent
                .post(&endpoint)
                .header("Accept", "application/json")
                .send_json(&request)
                .map_err(|e| transport_error(e).with_backend(BACKEND))?;

            let status = response.status().as_u16();
            let mut body_reader = response.into_body();

            if status >= 400 {
                let error_body = body_reader
                    .read_to_string()
                    .unwrap_or_else(|_| "(unable to read error body)".to_owned());
                return Err(StorageError::http_status(status, error_body).with_backend(BACKEND));
            }

            let reply: Reply = body_reader
                .read_json()
                .map_err(|e| transport_error(e).with_backend(BACKEND))?;
            reply.into_success(&request)
        })
        .await
    }
}

#[async_trait]
impl PersistenceAdapter for HttpStorage {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, tree), fields(backend = BACKEND))]
    async fn save(&self, scope_id: &str, project_id: &str, tree: &Tree) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let tree = serde_json::to_value(tree).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidData)
                .with_backend(BACKEND)
                .with_source(e)
        })?;

        self.call(Request {
            action: Action::Save,
            scope_id: scope_id.to_string(),
            project_id: Some(project_id.to_string()),
            tree: Some(tree),
        })
        .await?;

        debug!("Saved project");
        Ok(())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn load(&self, scope_id: &str, project_id: &str) -> StorageResult<Tree> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let reply = self
            .call(Request {
                action: Action::Load,
                scope_id: scope_id.to_string(),
                project_id: Some(project_id.to_string()),
                tree: None,
            })
            .await?;

        // A successful reply without a tree means the endpoint has nothing stored
        let tree = reply
            .tree
            .ok_or_else(|| StorageError::not_found(scope_id, project_id).with_backend(BACKEND))?;

        Tree::from_value(tree).map_err(|e| {
            StorageError::invalid_data(e)
                .with_backend(BACKEND)
                .with_key(scope_id, project_id)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn list(&self, scope_id: &str) -> StorageResult<Vec<String>> {
        check_key(scope_id).map_err(|e| e.with_backend(BACKEND))?;
        let reply = self
            .call(Request {
                action: Action::List,
                scope_id: scope_id.to_string(),
                project_id: None,
                tree: None,
            })
            .await?;

        let mut projects = reply.projects.unwrap_or_default();
        projects.sort();
        Ok(projects)
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete(&self, scope_id: &str, project_id: &str) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        self.call(Request {
            action: Action::Delete,
            scope_id: scope_id.to_string(),
            project_id: Some(project_id.to_string()),
            tree: None,
        })
        .await
        .map(|_| ())
    }
}

pub(crate) fn default_agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Run a blocking HTTP exchange off the async runtime
pub(crate) async fn blocking<T, F>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::new(StorageErrorKind::Other).with_source(e))?
}

/// Map a transport failure, treating timeouts and connection problems as retryable
pub(crate) fn transport_error(err: ureq::Error) -> StorageError {
    use crate::adapter::ErrorStatus;

    let (kind, status) = match &err {
        ureq::Error::Timeout(_) => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
        ureq::Error::Io(_) | ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
            (StorageErrorKind::Unavailable, ErrorStatus::Temporary)
        }
        _ => (StorageErrorKind::Other, ErrorStatus::Permanent),
    };
    StorageError::new(kind).with_status(status).with_source(err)
}
