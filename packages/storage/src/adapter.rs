//! Persistence adapter trait and error types.
//!
//! Every backend stores one serialized Vibe Tree per `(scope, project)` pair.
//! The scope is usually a user id; the project id names one site.
//!
//! # Key Convention
//!
//! Scope and project ids end up in file paths and URLs, so both must be
//! non-empty, must not start with `.`, and may only contain ASCII letters,
//! digits, `-`, `_`, `.` and `@`.

use async_trait::async_trait;
use vibe_tree::{Tree, TreeError};

pub type StorageResult<T> = Result<T, StorageError>;

/// Save/load contract shared by every backend
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Backend identifier for logs and errors (e.g. "Fs", "GitHub")
    fn name(&self) -> &'static str;

    /// Idempotent upsert; the last writer wins
    async fn save(&self, scope_id: &str, project_id: &str, tree: &Tree) -> StorageResult<()>;

    /// Fails with [`StorageErrorKind::NotFound`] if absent
    async fn load(&self, scope_id: &str, project_id: &str) -> StorageResult<Tree>;

    /// Project ids stored under `scope_id`, sorted
    async fn list(&self, scope_id: &str) -> StorageResult<Vec<String>>;

    /// Fails with [`StorageErrorKind::NotFound`] if absent
    async fn delete(&self, scope_id: &str, project_id: &str) -> StorageResult<()>;
}

/// Semantic error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Project does not exist.
    NotFound,
    /// Credentials missing or rejected.
    PermissionDenied,
    /// Scope or project id is not a valid key.
    InvalidKey,
    /// Stored payload is not a valid tree.
    InvalidData,
    /// Concurrent write detected by the backend.
    Conflict,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Too many requests.
    RateLimited,
    /// Operation timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (bad key, not found, bad credentials).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (rate limited, service unavailable).
    Persistent,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// `scope/project` the operation targeted.
    pub key: Option<String>,
    /// Backend identifier (e.g., "Fs", "Http").
    pub backend: Option<&'static str>,
    /// Message reported by the backend itself.
    pub message: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            key: None,
            backend: None,
            message: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, scope_id: &str, project_id: &str) -> Self {
        self.key = Some(format!("{scope_id}/{project_id}"));
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope_id: &str) -> Self {
        self.key = Some(scope_id.to_string());
        self
    }

    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    #[must_use]
    pub fn not_found(scope_id: &str, project_id: &str) -> Self {
        Self::new(StorageErrorKind::NotFound).with_key(scope_id, project_id)
    }

    /// Stored payload failed to parse or validate
    #[must_use]
    pub fn invalid_data(err: TreeError) -> Self {
        Self::new(StorageErrorKind::InvalidData).with_source(err)
    }

    #[must_use]
    pub fn io(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            std::io::ErrorKind::TimedOut => StorageErrorKind::Timeout,
            _ => StorageErrorKind::Other,
        };
        let status = match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => ErrorStatus::Temporary,
            _ => ErrorStatus::Permanent,
        };
        Self::new(kind).with_status(status).with_source(err)
    }

    /// Map an HTTP error status to a kind and retry guidance
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let (kind, retry) = match status {
            401 | 403 => (StorageErrorKind::PermissionDenied, ErrorStatus::Permanent),
            404 => (StorageErrorKind::NotFound, ErrorStatus::Permanent),
            408 => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
            409 | 422 => (StorageErrorKind::Conflict, ErrorStatus::Temporary),
            429 => (StorageErrorKind::RateLimited, ErrorStatus::Persistent),
            500..=599 => (StorageErrorKind::Unavailable, ErrorStatus::Persistent),
            _ => (StorageErrorKind::Other, ErrorStatus::Permanent),
        };
        Self::new(kind)
            .with_status(retry)
            .with_message(format!("HTTP {status}: {}", body.into()))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    pub fn is_retryable(&self) -> bool {
        self.status != ErrorStatus::Permanent
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message: source (key: scope/project)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::PermissionDenied => "Permission denied",
            StorageErrorKind::InvalidKey => "Invalid key",
            StorageErrorKind::InvalidData => "Invalid data",
            StorageErrorKind::Conflict => "Conflict",
            StorageErrorKind::Unavailable => "Unavailable",
            StorageErrorKind::RateLimited => "Rate limited",
            StorageErrorKind::Timeout => "Timeout",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Check that a scope or project id is usable as a storage key
pub fn check_key(value: &str) -> StorageResult<()> {
    let valid = !value.is_empty()
        && !value.starts_with('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::new(StorageErrorKind::InvalidKey)
            .with_message(format!("'{value}' is not a valid scope or project id")))
    }
}

/// Check both halves of a project key
pub(crate) fn check_project_key(
    backend: &'static str,
    scope_id: &str,
    project_id: &str,
) -> StorageResult<()> {
    check_key(scope_id)
        .and_then(|()| check_key(project_id))
        .map_err(|e| e.with_backend(backend))
}
