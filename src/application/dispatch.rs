//! Generic execution envelope for memo operations.
//!
//! Routes describe their behavior with a [`DispatchPolicy`]; the
//! [`Dispatcher`] runs the named operation against the selected repository and
//! emits one invalidation signal after every successful write.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cache::InvalidationSink;
use crate::domain::error::DomainError;
use crate::domain::memo::{MemoId, NewMemo};

use super::repos::{OperationContext, RepoError};
use super::selector::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListMemos,
    CreateMemo,
    DeleteMemo,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ListMemos => "list_memos",
            Operation::CreateMemo => "create_memo",
            Operation::DeleteMemo => "delete_memo",
        }
    }
}

/// How a route's operation interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub operation: Operation,
    /// Read through the selected backend instead of going to the store.
    /// Ignored for writes, which always target the store.
    pub uses_cached_read: bool,
    pub invalidates_on_success: bool,
}

impl DispatchPolicy {
    pub const fn cached_read(operation: Operation) -> Self {
        Self {
            operation,
            uses_cached_read: true,
            invalidates_on_success: false,
        }
    }

    pub const fn invalidating_write(operation: Operation) -> Self {
        Self {
            operation,
            uses_cached_read: false,
            invalidates_on_success: true,
        }
    }
}

/// Raw request input handed to an operation.
#[derive(Debug, Clone, Default)]
pub struct OperationInput {
    pub id: Option<String>,
    pub body: Bytes,
}

impl OperationInput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            body: Bytes::new(),
        }
    }

    pub fn with_body(body: impl Into<Bytes>) -> Self {
        Self {
            id: None,
            body: body.into(),
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    selection: Selection,
    invalidation: Arc<dyn InvalidationSink>,
    backend_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        selection: Selection,
        invalidation: Arc<dyn InvalidationSink>,
        backend_timeout: Option<Duration>,
    ) -> Self {
        Self {
            selection,
            invalidation,
            backend_timeout,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn context(&self) -> OperationContext {
        OperationContext::from_timeout(self.backend_timeout)
    }

    /// Run an operation and signal invalidation when a write succeeds.
    ///
    /// The signal never blocks the caller and its downstream failures are not
    /// reported here.
    #[instrument(skip_all, fields(operation = policy.operation.as_str()))]
    pub async fn dispatch(
        &self,
        policy: &DispatchPolicy,
        input: OperationInput,
    ) -> Result<Bytes, RepoError> {
        let ctx = self.context();
        let payload = self.invoke(policy, &ctx, input).await?;

        if policy.invalidates_on_success {
            self.invalidation.signal(policy.operation);
        }

        debug!(
            bytes = payload.len(),
            backend = %self.selection.backend(),
            "operation succeeded"
        );
        Ok(payload)
    }

    async fn invoke(
        &self,
        policy: &DispatchPolicy,
        ctx: &OperationContext,
        input: OperationInput,
    ) -> Result<Bytes, RepoError> {
        let handle = self.selection.handle();
        match policy.operation {
            Operation::ListMemos if policy.uses_cached_read => handle.list_all(ctx).await,
            Operation::ListMemos => handle.list_from_store(ctx).await,
            Operation::CreateMemo => {
                let memo = NewMemo::from_json(&input.body)?;
                handle.insert(ctx, &memo).await
            }
            Operation::DeleteMemo => {
                let raw = input
                    .id
                    .as_deref()
                    .ok_or_else(|| DomainError::validation("memo id is required"))?;
                let id: MemoId = raw.parse()?;
                handle.delete_by_id(ctx, id).await
            }
        }
    }
}
