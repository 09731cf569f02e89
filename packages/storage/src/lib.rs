//! # Vibe Storage
//!
//! Persistence for Vibe Trees. Every backend implements [`PersistenceAdapter`]
//! and stores one JSON tree per `(scope, project)`.
//!
//! ## Backends
//!
//! - [`MemoryStorage`]: in-process map, for tests and ephemeral sessions
//! - [`FsStorage`]: `<root>/<scope>/<project>.json` with atomic writes
//! - [`HttpStorage`]: a single JSON endpoint (`{action, scopeId, projectId}`)
//! - [`GitHubStorage`]: files committed through the contents API
//!
//! ## Autosave
//!
//! [`Autosaver`] runs a [`SaveQueue`] on a tokio task. Its handle is a
//! session observer, so registering it on an `EditSession` saves every change
//! with at most one write in flight:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vibe_editor::{CompileContext, EditSession};
//! use vibe_storage::{Autosaver, MemoryStorage};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let autosaver = Autosaver::spawn(Arc::new(MemoryStorage::new()), "u1", "landing");
//! let mut session = EditSession::template(CompileContext::anonymous())?;
//! session.add_observer(Box::new(autosaver.handle()));
//! // ... edit ...
//! let status = autosaver.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod autosave;
pub mod config;
pub mod fs;
pub mod github;
pub mod http;
pub mod memory;
pub mod save_queue;

pub use adapter::{
    check_key, ErrorStatus, PersistenceAdapter, StorageError, StorageErrorKind, StorageResult,
};
pub use autosave::{Autosaver, AutosaverHandle, SaveStatus};
pub use config::BackendConfig;
pub use fs::FsStorage;
pub use github::GitHubStorage;
pub use http::HttpStorage;
pub use memory::MemoryStorage;
pub use save_queue::{QueueState, SaveQueue};
