//! Startup selection of the backend that answers reads.
//!
//! The decision is made once: a cache holding a materialized listing wins,
//! otherwise reads fall back to the durable store. The result is returned as
//! a [`Selection`] value and never re-evaluated for the life of the process.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument};

use crate::domain::memo::{MemoId, NewMemo};

use super::repos::{
    Backend, CacheBackend, CacheConnector, OperationContext, RepoError, StoreBackend,
    StoreConnector,
};

const METRIC_READS_TOTAL: &str = "memoapp_reads_total";

#[derive(Clone)]
enum ActiveBackend {
    Cache(Arc<dyn CacheBackend>),
    Store(Arc<dyn StoreBackend>),
}

/// Store connection shared by every clone of a handle.
///
/// Cache-backed handles connect on the first write; store-backed handles
/// start with the connection made during selection.
struct StoreSlot {
    connector: Arc<dyn StoreConnector>,
    connection: OnceCell<Arc<dyn StoreBackend>>,
}

impl StoreSlot {
    async fn get(&self) -> Result<Arc<dyn StoreBackend>, RepoError> {
        self.connection
            .get_or_try_init(|| self.connector.connect())
            .await
            .map(Arc::clone)
    }
}

/// The active backend reference, immutable after selection.
///
/// Reads go to whichever backend was selected; writes always reach the store.
#[derive(Clone)]
pub struct RepositoryHandle {
    active: ActiveBackend,
    store: Arc<StoreSlot>,
}

impl RepositoryHandle {
    fn cache_backed(cache: Arc<dyn CacheBackend>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            active: ActiveBackend::Cache(cache),
            store: Arc::new(StoreSlot {
                connector,
                connection: OnceCell::new(),
            }),
        }
    }

    fn store_backed(store: Arc<dyn StoreBackend>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            active: ActiveBackend::Store(store.clone()),
            store: Arc::new(StoreSlot {
                connector,
                connection: OnceCell::new_with(Some(store)),
            }),
        }
    }

    pub fn backend(&self) -> Backend {
        match self.active {
            ActiveBackend::Cache(_) => Backend::Cache,
            ActiveBackend::Store(_) => Backend::Store,
        }
    }

    /// Full listing from the active backend, without re-checking freshness.
    pub async fn list_all(&self, ctx: &OperationContext) -> Result<Bytes, RepoError> {
        let backend = self.backend();
        counter!(METRIC_READS_TOTAL, "backend" => backend.as_str()).increment(1);
        match &self.active {
            ActiveBackend::Cache(cache) => ctx.run(backend, cache.list_all()).await,
            ActiveBackend::Store(store) => ctx.run(backend, store.list_all()).await,
        }
    }

    /// Full listing straight from the store, bypassing the cache.
    pub async fn list_from_store(&self, ctx: &OperationContext) -> Result<Bytes, RepoError> {
        counter!(METRIC_READS_TOTAL, "backend" => Backend::Store.as_str()).increment(1);
        ctx.run(Backend::Store, async {
            let store = self.store.get().await?;
            store.list_all().await
        })
        .await
    }

    pub async fn insert(&self, ctx: &OperationContext, memo: &NewMemo) -> Result<Bytes, RepoError> {
        ctx.run(Backend::Store, async {
            let store = self.store.get().await?;
            store.insert(memo).await
        })
        .await
    }

    pub async fn delete_by_id(
        &self,
        ctx: &OperationContext,
        id: MemoId,
    ) -> Result<Bytes, RepoError> {
        ctx.run(Backend::Store, async {
            let store = self.store.get().await?;
            store.delete_by_id(id).await
        })
        .await
    }

    pub async fn store_health(&self, ctx: &OperationContext) -> Result<(), RepoError> {
        ctx.run(Backend::Store, async {
            let store = self.store.get().await?;
            store.health_check().await
        })
        .await
    }
}

/// Outcome of a selection run.
#[derive(Clone)]
pub struct Selection {
    handle: RepositoryHandle,
    cache_backed: bool,
}

impl Selection {
    pub fn handle(&self) -> &RepositoryHandle {
        &self.handle
    }

    /// Whether reads are served from the cache for this process.
    pub fn is_cache_backed(&self) -> bool {
        self.cache_backed
    }

    pub fn backend(&self) -> Backend {
        self.handle.backend()
    }
}

pub struct RepositorySelector {
    cache: Arc<dyn CacheConnector>,
    store: Arc<dyn StoreConnector>,
}

impl RepositorySelector {
    pub fn new(cache: Arc<dyn CacheConnector>, store: Arc<dyn StoreConnector>) -> Self {
        Self { cache, store }
    }

    /// Decide which backend answers reads.
    ///
    /// An unreachable cache is fatal and the store is never contacted, so an
    /// operator can tell a cache outage from a store outage. Each call makes
    /// a fresh, independent decision. Every backend call shares the deadline
    /// carried by `ctx`.
    #[instrument(skip_all)]
    pub async fn select(&self, ctx: &OperationContext) -> Result<Selection, RepoError> {
        let cache = ctx
            .run(Backend::Cache, async {
                self.cache
                    .connect()
                    .await
                    .map_err(|err| RepoError::connection(Backend::Cache, err.message()))
            })
            .await
            .inspect_err(|err| {
                error!(error = %err, "failed to connect to cache backend");
            })?;

        let cached = ctx
            .run(Backend::Cache, cache.exists())
            .await
            .inspect_err(|err| {
                error!(error = %err, "failed to check for a cached listing");
            })?;

        if cached {
            info!(backend = %Backend::Cache, "cached listing found; serving reads from cache");
            return Ok(Selection {
                handle: RepositoryHandle::cache_backed(cache, self.store.clone()),
                cache_backed: true,
            });
        }

        info!("no cached listing; falling back to store");
        let store = ctx
            .run(Backend::Store, async {
                self.store
                    .connect()
                    .await
                    .map_err(|err| RepoError::connection(Backend::Store, err.message()))
            })
            .await
            .inspect_err(|err| {
                error!(error = %err, "failed to connect to store backend");
            })?;

        info!(backend = %Backend::Store, "serving reads from store");
        Ok(Selection {
            handle: RepositoryHandle::store_backed(store, self.store.clone()),
            cache_backed: false,
        })
    }
}
