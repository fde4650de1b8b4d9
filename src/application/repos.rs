//! Repository traits describing the cache and store adapters.
//!
//! Both backends exchange serialized JSON bytes with the application; neither
//! side decodes the listing it hands back.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::domain::error::DomainError;
use crate::domain::memo::{MemoId, NewMemo};

/// Which backend answered (or failed) an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Cache,
    Store,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Cache => "cache",
            Backend::Store => "store",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConnectionFailure,
    ReadFailure,
    WriteFailure,
    NotFound,
    ValidationFailure,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectionFailure => "connection_failure",
            ErrorKind::ReadFailure => "read_failure",
            ErrorKind::WriteFailure => "write_failure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a backend or by request validation.
///
/// `component` names the originating part of the system (`cache`, `store`,
/// `domain`) so callers can report where a failure came from without parsing
/// the message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} in `{component}`: {message}")]
pub struct RepoError {
    kind: ErrorKind,
    component: &'static str,
    message: String,
}

impl RepoError {
    pub fn new(kind: ErrorKind, component: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            component,
            message: message.into(),
        }
    }

    pub fn connection(backend: Backend, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionFailure, backend.as_str(), message)
    }

    pub fn read(backend: Backend, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReadFailure, backend.as_str(), message)
    }

    pub fn write(backend: Backend, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WriteFailure, backend.as_str(), message)
    }

    pub fn not_found(backend: Backend, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, backend.as_str(), message)
    }

    pub fn cancelled(backend: Backend, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, backend.as_str(), message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DomainError> for RepoError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => {
                Self::new(ErrorKind::ValidationFailure, "domain", message)
            }
        }
    }
}

/// Per-request execution context carrying the backend deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationContext {
    deadline: Option<Instant>,
}

impl OperationContext {
    pub fn unbounded() -> Self {
        Self { deadline: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Bounded when a timeout is configured, unbounded otherwise.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::unbounded, Self::with_timeout)
    }

    /// Run a backend call, failing with `Cancelled` once the deadline passes.
    ///
    /// A write cut off here has an unknown outcome; callers must not assume
    /// it was committed.
    pub async fn run<T, F>(&self, backend: Backend, call: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, call)
                .await
                .map_err(|_| RepoError::cancelled(backend, "backend deadline elapsed"))?,
            None => call.await,
        }
    }
}

#[async_trait]
pub trait CacheConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn CacheBackend>, RepoError>;
}

/// Read-only view of the cached listing.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Whether a materialized listing is currently held.
    async fn exists(&self) -> Result<bool, RepoError>;

    async fn list_all(&self) -> Result<Bytes, RepoError>;
}

/// Write access to the cached listing, used only by the refresh path.
#[async_trait]
pub trait CachePopulator: Send + Sync {
    async fn store_listing(&self, listing: Bytes) -> Result<(), RepoError>;

    async fn evict_listing(&self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn StoreBackend>, RepoError>;
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn list_all(&self) -> Result<Bytes, RepoError>;

    /// Persist a memo and return it serialized with its assigned id.
    async fn insert(&self, memo: &NewMemo) -> Result<Bytes, RepoError>;

    /// Remove a memo, returning a serialized `{"id": n}` confirmation.
    async fn delete_by_id(&self, id: MemoId) -> Result<Bytes, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}
