use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vibe_editor::{CompileContext, History, DEFAULT_MAX_LEVELS};
use vibe_storage::{BackendConfig, PersistenceAdapter};

pub const DEFAULT_CONFIG_NAME: &str = "vibe.config.json";

/// Scope used when no user id is configured
pub const LOCAL_SCOPE: &str = "local";

/// Vibe configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Tree file edited by the CLI
    #[serde(default = "default_tree_file")]
    pub tree_file: String,

    /// Compiled HTML output
    #[serde(default = "default_out_file")]
    pub out_file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Form submission endpoint embedded in instrumented pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forms_endpoint: Option<String>,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub storage: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Undo levels kept; 0 keeps everything
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

fn default_tree_file() -> String {
    "site.json".to_string()
}

fn default_out_file() -> String {
    "index.html".to_string()
}

fn default_max_levels() -> usize {
    DEFAULT_MAX_LEVELS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_levels: default_max_levels(),
        }
    }
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| anyhow!("Invalid {}: {}", DEFAULT_CONFIG_NAME, e))?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn tree_path(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.tree_file)
    }

    pub fn out_path(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.out_file)
    }

    /// Compile context; instrumentation needs both ids
    pub fn context(&self) -> CompileContext {
        let context = match (&self.user_id, &self.project_id) {
            (Some(user), Some(project)) => CompileContext::for_project(user, project),
            _ => CompileContext::anonymous(),
        };
        match &self.forms_endpoint {
            Some(endpoint) => context.with_forms_endpoint(endpoint),
            None => context,
        }
    }

    pub fn history(&self) -> History {
        History::with_max_levels(self.history.max_levels)
    }

    /// Storage backend, with a relative fs root taken from `cwd`
    pub fn backend(&self, cwd: &Path) -> BackendConfig {
        self.storage.clone().relative_to(cwd)
    }

    pub fn adapter(&self, cwd: &Path) -> Arc<dyn PersistenceAdapter> {
        self.backend(cwd).build()
    }

    /// Storage scope: the user id, or a shared local scope
    pub fn scope(&self) -> &str {
        self.user_id.as_deref().unwrap_or(LOCAL_SCOPE)
    }

    /// Resolve the project id from an explicit argument or the config
    pub fn project<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str> {
        explicit
            .or(self.project_id.as_deref())
            .ok_or_else(|| anyhow!("No project id: pass --project or set projectId in {}", DEFAULT_CONFIG_NAME))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tree_file: default_tree_file(),
            out_file: default_out_file(),
            user_id: None,
            project_id: None,
            forms_endpoint: None,
            history: HistoryConfig::default(),
            storage: BackendConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "treeFile": "pages/home.json",
            "userId": "u1",
            "projectId": "home",
            "formsEndpoint": "https://forms.example.com",
            "history": { "maxLevels": 20 },
            "storage": { "kind": "http", "endpoint": "https://example.com/exec" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.tree_file, "pages/home.json");
        assert_eq!(config.out_file, "index.html");
        assert_eq!(config.history.max_levels, 20);
        assert_eq!(config.scope(), "u1");
        assert_eq!(config.project(None).unwrap(), "home");
        assert_eq!(config.project(Some("other")).unwrap(), "other");
        assert_eq!(
            config.storage,
            BackendConfig::Http {
                endpoint: "https://example.com/exec".to_string()
            }
        );
        assert_eq!(
            config.context(),
            CompileContext::for_project("u1", "home").with_forms_endpoint("https://forms.example.com")
        );
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scope(), LOCAL_SCOPE);
        assert_eq!(config.history.max_levels, 100);
        assert_eq!(config.context(), CompileContext::anonymous());
        assert!(config.project(None).is_err());
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_fs_root_is_relative_to_working_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "storage": { "kind": "fs", "root": "store" } }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(
            config.backend(dir.path()),
            BackendConfig::Fs {
                root: dir.path().join("store")
            }
        );
    }
}
