//! Backend selection from configuration

use crate::adapter::PersistenceAdapter;
use crate::fs::FsStorage;
use crate::github::{GitHubStorage, DEFAULT_BRANCH, DEFAULT_DIRECTORY, TOKEN_ENV};
use crate::http::HttpStorage;
use crate::memory::MemoryStorage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tagged backend description, e.g. `{"kind":"fs","root":".vibe"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackendConfig {
    Memory,
    Fs {
        #[serde(default = "default_fs_root")]
        root: PathBuf,
    },
    Http {
        endpoint: String,
    },
    #[serde(rename = "github")]
    GitHub {
        owner: String,
        repo: String,
        #[serde(default = "default_branch")]
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default = "default_directory")]
        directory: String,
    },
}

fn default_fs_root() -> PathBuf {
    PathBuf::from(".vibe")
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_directory() -> String {
    DEFAULT_DIRECTORY.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Fs {
            root: default_fs_root(),
        }
    }
}

impl BackendConfig {
    /// Join a relative filesystem root onto `base`; other backends are unchanged
    pub fn relative_to(self, base: &Path) -> Self {
        match self {
            BackendConfig::Fs { root } if root.is_relative() => BackendConfig::Fs {
                root: base.join(root),
            },
            other => other,
        }
    }

    /// Instantiate the adapter. A GitHub token missing from the config is
    /// read from `VIBE_GITHUB_TOKEN`.
    pub fn build(&self) -> Arc<dyn PersistenceAdapter> {
        match self {
            BackendConfig::Memory => Arc::new(MemoryStorage::new()),
            BackendConfig::Fs { root } => Arc::new(FsStorage::new(root.clone())),
            BackendConfig::Http { endpoint } => Arc::new(HttpStorage::new(endpoint.clone())),
            BackendConfig::GitHub {
                owner,
                repo,
                branch,
                token,
                directory,
            } => {
                let token = token
                    .clone()
                    .or_else(|| std::env::var(TOKEN_ENV).ok());
                Arc::new(
                    GitHubStorage::new(owner.clone(), repo.clone())
                        .with_branch(branch.clone())
                        .with_directory(directory.clone())
                        .with_token(token),
                )
            }
        }
    }
}
