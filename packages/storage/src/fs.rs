//! Filesystem backend
//!
//! Layout: `<root>/<scope>/<project>.json`. Writes go to a hidden temp file
//! in the same directory and are renamed into place, so readers never see a
//! half-written tree.

use crate::adapter::{check_key, check_project_key, PersistenceAdapter, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use vibe_tree::Tree;

const BACKEND: &str = "Fs";
const EXTENSION: &str = ".json";

#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_dir(&self, scope_id: &str) -> PathBuf {
        self.root.join(scope_id)
    }

    fn project_path(&self, scope_id: &str, project_id: &str) -> PathBuf {
        self.scope_dir(scope_id).join(format!("{project_id}{EXTENSION}"))
    }

    fn io_error(err: std::io::Error, scope_id: &str, project_id: &str) -> StorageError {
        StorageError::io(err)
            .with_backend(BACKEND)
            .with_key(scope_id, project_id)
    }
}

#[async_trait]
impl PersistenceAdapter for FsStorage {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, tree), fields(backend = BACKEND))]
    async fn save(&self, scope_id: &str, project_id: &str, tree: &Tree) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let json = tree
            .to_json_pretty()
            .map_err(|e| StorageError::invalid_data(e).with_backend(BACKEND))?;

        let dir = self.scope_dir(scope_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Self::io_error(e, scope_id, project_id))?;

        let temp = dir.join(format!(".{project_id}{EXTENSION}.tmp"));
        let path = self.project_path(scope_id, project_id);

        tokio::fs::write(&temp, json.as_bytes())
            .await
            .map_err(|e| Self::io_error(e, scope_id, project_id))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| Self::io_error(e, scope_id, project_id))?;

        debug!(path = %path.display(), bytes = json.len(), "Saved project");
        Ok(())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn load(&self, scope_id: &str, project_id: &str) -> StorageResult<Tree> {
        check_project_key(BACKEND, scope_id, project_id)?;
        let path = self.project_path(scope_id, project_id);

        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Self::io_error(e, scope_id, project_id))?;

        Tree::from_json(&json).map_err(|e| {
            StorageError::invalid_data(e)
                .with_backend(BACKEND)
                .with_key(scope_id, project_id)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn list(&self, scope_id: &str) -> StorageResult<Vec<String>> {
        check_key(scope_id).map_err(|e| e.with_backend(BACKEND))?;

        let mut entries = match tokio::fs::read_dir(self.scope_dir(scope_id)).await {
            Ok(entries) => entries,
            // A scope that never saved anything has no directory yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::io(e)
                    .with_backend(BACKEND)
                    .with_scope(scope_id))
            }
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(e).with_backend(BACKEND).with_scope(scope_id))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(project) = name.strip_suffix(EXTENSION) {
                projects.push(project.to_string());
            }
        }

        projects.sort();
        Ok(projects)
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete(&self, scope_id: &str, project_id: &str) -> StorageResult<()> {
        check_project_key(BACKEND, scope_id, project_id)?;
        tokio::fs::remove_file(self.project_path(scope_id, project_id))
            .await
            .map_err(|e| Self::io_error(e, scope_id, project_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StorageErrorKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_layout_on_disk() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.save("alice", "landing", &Tree::template()).await.unwrap();

        let path = dir.path().join("alice").join("landing.json");
        assert!(path.exists());
        assert!(!dir.path().join("alice").join(".landing.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_list_ignores_temp_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::new(dir.path());
        storage.save("alice", "b", &Tree::template()).await.unwrap();
        storage.save("alice", "a", &Tree::template()).await.unwrap();

        let scope = dir.path().join("alice");
        std::fs::write(scope.join(".c.json.tmp"), "{}").unwrap();
        std::fs::write(scope.join("notes.txt"), "hi").unwrap();

        assert_eq!(storage.list("alice").await.unwrap(), vec!["a", "b"]);
        assert!(storage.list("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::new(dir.path());
        std::fs::create_dir_all(dir.path().join("alice")).unwrap();
        std::fs::write(dir.path().join("alice").join("broken.json"), "{ not json").unwrap();

        let err = storage.load("alice", "broken").await.unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::InvalidData);
    }
}
