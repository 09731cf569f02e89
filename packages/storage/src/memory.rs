//! In-memory backend.
//!
//! Stores serialized trees in a map, so loads go through the same JSON
//! round trip as every other backend. Used by tests and as the browser-local
//! analogue when nothing else is configured.

use crate::adapter::{check_project_key, PersistenceAdapter, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use vibe_tree::Tree;

const BACKEND: &str = "Memory";

#[derive(Debug, Default)]
pub struct MemoryStorage {
    projects: RwLock<BTreeMap<(String, String), String>>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Raw stored payload, if any
    pub async fn raw(&self, scope_id: &str, project_id: &str) -> Option<String> {
        self.projects
            .read()
            .await
            .get(&(scope_id.to_string(), project_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStorage {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn save(&self, scope_id: &str, project_id: &str, tree: &Tree) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let json = tree
            .to_json()
            .map_err(|e| StorageError::invalid_data(e).with_backend(BACKEND))?;

        self.projects
            .write()
            .await
            .insert((scope_id.to_string(), project_id.to_string()), json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, scope_id: &str, project_id: &str) -> StorageResult<Tree> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let projects = self.projects.read().await;
        let json = projects
            .get(&(scope_id.to_string(), project_id.to_string()))
            .ok_or_else(|| StorageError::not_found(scope_id, project_id).with_backend(BACKEND))?;

        Tree::from_json(json).map_err(|e| {
            StorageError::invalid_data(e)
                .with_backend(BACKEND)
                .with_key(scope_id, project_id)
        })
    }

    async fn list(&self, scope_id: &str) -> StorageResult<Vec<String>> {
        crate::adapter::check_key(scope_id).map_err(|e| e.with_backend(BACKEND))?;
        let projects = self.projects.read().await;
        Ok(projects
            .keys()
            .filter(|(scope, _)| scope == scope_id)
            .map(|(_, project)| project.clone())
            .collect())
    }

    async fn delete(&self, scope_id: &str, project_id: &str) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        self.projects
            .write()
            .await
            .remove(&(scope_id.to_string(), project_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(scope_id, project_id).with_backend(BACKEND))
    }
}
