//! GitHub contents backend
//!
//! Each project is one file, `<directory>/<scope>/<project>.json`, committed
//! to a branch through the REST contents API. Updates and deletes need the
//! blob sha of the current file, so both start with a GET.

use crate::adapter::{
    check_key, check_project_key, PersistenceAdapter, StorageError, StorageErrorKind, StorageResult,
};
use crate::http::{blocking, default_agent, transport_error};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use ureq::Agent;
use vibe_tree::Tree;

const BACKEND: &str = "GitHub";

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_DIRECTORY: &str = "vibe";

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV: &str = "VIBE_GITHUB_TOKEN";

#[derive(Debug, Clone)]
pub struct GitHubStorage {
    agent: Agent,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    directory: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    message: String,
    sha: String,
    branch: &'a str,
}

impl GitHubStorage {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            agent: default_agent(),
            api_base: DEFAULT_API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            branch: DEFAULT_BRANCH.to_string(),
            directory: DEFAULT_DIRECTORY.to_string(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into().trim_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Point at a GitHub Enterprise or test server
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_owned();
        self
    }

    fn scope_path(&self, scope_id: &str) -> String {
        if self.directory.is_empty() {
            scope_id.to_string()
        } else {
            format!("{}/{scope_id}", self.directory)
        }
    }

    fn project_path(&self, scope_id: &str, project_id: &str) -> String {
        format!("{}/{project_id}.json", self.scope_path(scope_id))
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{path}",
            self.api_base, self.owner, self.repo
        )
    }

    fn exchange(&self) -> Exchange {
        Exchange {
            agent: self.agent.clone(),
            token: self.token.clone(),
        }
    }

    /// Fetch the file at `path`, `None` when it does not exist
    async fn get_file(&self, path: &str) -> StorageResult<Option<ContentFile>> {
        let url = format!("{}?ref={}", self.contents_url(path), self.branch);
        let exchange = self.exchange();
        blocking(move || exchange.get(&url)).await
    }
}

/// Owned request state moved onto the blocking pool
struct Exchange {
    agent: Agent,
    token: Option<String>,
}

impl Exchange {
    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "vibe-storage");
        match &self.token {
            Some(token) => request.header("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> StorageResult<Option<T>> {
        let response = self
            .authorize(self.agent.get(url))
            .call()
            .map_err(|e| transport_error(e).with_backend(BACKEND))?;
        read_response(response)
    }

    fn send<T: Serialize>(&self, request: ureq::RequestBuilder<ureq::typestate::WithBody>, body: &T) -> StorageResult<()> {
        let response = self
            .authorize(request)
            .send_json(body)
            .map_err(|e| transport_error(e).with_backend(BACKEND))?;
        read_response::<serde_json::Value>(response).map(|_| ())
    }
}

fn read_response<T: serde::de::DeserializeOwned>(
    response: ureq::http::Response<ureq::Body>,
) -> StorageResult<Option<T>> {
    let status = response.status().as_u16();
    let mut body_reader = response.into_body();

    if status == 404 {
        return Ok(None);
    }

    if status >= 400 {
        let error_body = body_reader
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(StorageError::http_status(status, error_body).with_backend(BACKEND));
    }

    body_reader
        .read_json()
        .map(Some)
        .map_err(|e| transport_error(e).with_backend(BACKEND))
}

/// Decode the base64 payload GitHub wraps at 60 columns
fn decode_content(content: &str) -> StorageResult<String> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| {
        StorageError::new(StorageErrorKind::InvalidData)
            .with_backend(BACKEND)
            .with_source(e)
    })?;
    String::from_utf8(bytes).map_err(|e| {
        StorageError::new(StorageErrorKind::InvalidData)
            .with_backend(BACKEND)
            .with_source(e)
    })
}

#[async_trait]
impl PersistenceAdapter for GitHubStorage {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, tree), fields(backend = BACKEND, repo = %self.repo))]
    async fn save(&self, scope_id: &str, project_id: &str, tree: &Tree) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let json = tree
            .to_json_pretty()
            .map_err(|e| StorageError::invalid_data(e).with_backend(BACKEND))?;

        let path = self.project_path(scope_id, project_id);
        let existing = self
            .get_file(&path)
            .await
            .map_err(|e| e.with_key(scope_id, project_id))?;

        let body = PutBody {
            message: format!("Save {scope_id}/{project_id}"),
            content: STANDARD.encode(json.as_bytes()),
            branch: &self.branch,
            sha: existing.map(|file| file.sha),
        };

        let url = self.contents_url(&path);
        let exchange = self.exchange();
        let body = serde_json::to_value(&body).map_err(|e| {
            StorageError::new(StorageErrorKind::Other)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        blocking(move || exchange.send(exchange.agent.put(&url), &body))
            .await
            .map_err(|e| e.with_key(scope_id, project_id))?;

        debug!(path = %path, "Committed project");
        Ok(())
    }

    #[instrument(skip(self), fields(backend = BACKEND, repo = %self.repo))]
    async fn load(&self, scope_id: &str, project_id: &str) -> StorageResult<Tree> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let path = self.project_path(scope_id, project_id);

        let file = self
            .get_file(&path)
            .await
            .map_err(|e| e.with_key(scope_id, project_id))?
            .ok_or_else(|| StorageError::not_found(scope_id, project_id).with_backend(BACKEND))?;

        let json = decode_content(&file.content).map_err(|e| e.with_key(scope_id, project_id))?;
        Tree::from_json(&json).map_err(|e| {
            StorageError::invalid_data(e)
                .with_backend(BACKEND)
                .with_key(scope_id, project_id)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND, repo = %self.repo))]
    async fn list(&self, scope_id: &str) -> StorageResult<Vec<String>> {
        check_key(scope_id).map_err(|e| e.with_backend(BACKEND))?;

        let url = format!(
            "{}?ref={}",
            self.contents_url(&self.scope_path(scope_id)),
            self.branch
        );
        let exchange = self.exchange();
        let entries: Option<Vec<DirectoryEntry>> = blocking(move || exchange.get(&url))
            .await
            .map_err(|e| e.with_scope(scope_id))?;

        let mut projects: Vec<String> = entries
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| entry.kind == "file")
            .filter_map(|entry| entry.name.strip_suffix(".json").map(str::to_string))
            .collect();
        projects.sort();
        Ok(projects)
    }

    #[instrument(skip(self), fields(backend = BACKEND, repo = %self.repo))]
    async fn delete(&self, scope_id: &str, project_id: &str) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let path = self.project_path(scope_id, project_id);

        let file = self
            .get_file(&path)
            .await
            .map_err(|e| e.with_key(scope_id, project_id))?
            .ok_or_else(|| StorageError::not_found(scope_id, project_id).with_backend(BACKEND))?;

        let body = DeleteBody {
            message: format!("Delete {scope_id}/{project_id}"),
            sha: file.sha,
            branch: &self.branch,
        };
        let body = serde_json::to_value(&body).map_err(|e| {
            StorageError::new(StorageErrorKind::Other)
                .with_backend(BACKEND)
                .with_source(e)
        })?;

        let url = self.contents_url(&path);
        let exchange = self.exchange();
        blocking(move || exchange.send(exchange.agent.delete(&url).force_send_body(), &body))
            .await
            .map_err(|e| e.with_key(scope_id, project_id))
    }
}
