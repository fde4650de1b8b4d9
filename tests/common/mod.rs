//! In-memory backends with call counters for integration tests.
#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;

use memoapp::application::dispatch::{Dispatcher, Operation};
use memoapp::application::repos::{
    Backend, CacheBackend, CacheConnector, CachePopulator, OperationContext, RepoError,
    StoreBackend, StoreConnector,
};
use memoapp::application::selector::{RepositorySelector, Selection};
use memoapp::cache::InvalidationSink;
use memoapp::domain::entities::{DeletedMemo, MemoRecord};
use memoapp::domain::memo::{MemoId, NewMemo};

pub fn memo(id: i64, text: &str) -> MemoRecord {
    MemoRecord {
        id: MemoId::new(id),
        text: text.to_string(),
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn listing(records: &[MemoRecord]) -> Bytes {
    Bytes::from(serde_json::to_vec(records).expect("serialize listing"))
}

pub fn decode_listing(bytes: &[u8]) -> Vec<MemoRecord> {
    serde_json::from_slice(bytes).expect("decode listing")
}

#[derive(Default)]
pub struct FakeCache {
    listing: Mutex<Option<Bytes>>,
    exists_error: Mutex<Option<RepoError>>,
    populate_error: Mutex<Option<RepoError>>,
    stalled: AtomicBool,
    pub exists_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub store_calls: AtomicUsize,
    pub evict_calls: AtomicUsize,
}

impl FakeCache {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn holding(records: &[MemoRecord]) -> Arc<Self> {
        let cache = Self::default();
        *cache.listing.lock().expect("lock") = Some(listing(records));
        Arc::new(cache)
    }

    pub fn fail_exists(&self, err: RepoError) {
        *self.exists_error.lock().expect("lock") = Some(err);
    }

    /// Make `exists` hang until the caller gives up.
    pub fn stall_exists(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn fail_populate(&self, err: RepoError) {
        *self.populate_error.lock().expect("lock") = Some(err);
    }

    pub fn current(&self) -> Option<Bytes> {
        self.listing.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CacheBackend for FakeCache {
    async fn exists(&self) -> Result<bool, RepoError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.exists_error.lock().expect("lock").clone() {
            return Err(err);
        }
        Ok(self.listing.lock().expect("lock").is_some())
    }

    async fn list_all(&self) -> Result<Bytes, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listing
            .lock()
            .expect("lock")
            .clone()
            .ok_or_else(|| RepoError::read(Backend::Cache, "listing missing"))
    }
}

#[async_trait]
impl CachePopulator for FakeCache {
    async fn store_listing(&self, listing: Bytes) -> Result<(), RepoError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.populate_error.lock().expect("lock").clone() {
            return Err(err);
        }
        *self.listing.lock().expect("lock") = Some(listing);
        Ok(())
    }

    async fn evict_listing(&self) -> Result<(), RepoError> {
        self.evict_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.populate_error.lock().expect("lock").clone() {
            return Err(err);
        }
        *self.listing.lock().expect("lock") = None;
        Ok(())
    }
}

pub struct FakeCacheConnector {
    cache: Arc<FakeCache>,
    failure: Option<RepoError>,
    pub connects: AtomicUsize,
}

impl FakeCacheConnector {
    pub fn new(cache: Arc<FakeCache>) -> Arc<Self> {
        Arc::new(Self {
            cache,
            failure: None,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: RepoError) -> Arc<Self> {
        Arc::new(Self {
            cache: FakeCache::empty(),
            failure: Some(err),
            connects: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CacheConnector for FakeCacheConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheBackend>, RepoError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.cache.clone()),
        }
    }
}

pub struct FakeStore {
    memos: Mutex<Vec<MemoRecord>>,
    next_id: AtomicI64,
    write_error: Mutex<Option<RepoError>>,
    delay: Mutex<Option<Duration>>,
    pub list_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeStore {
    pub fn with(records: &[MemoRecord]) -> Arc<Self> {
        let next_id = records.iter().map(|m| m.id.get()).max().unwrap_or(0) + 1;
        Arc::new(Self {
            memos: Mutex::new(records.to_vec()),
            next_id: AtomicI64::new(next_id),
            write_error: Mutex::new(None),
            delay: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with(&[])
    }

    pub fn fail_writes(&self, err: RepoError) {
        *self.write_error.lock().expect("lock") = Some(err);
    }

    pub fn delay_calls(&self, delay: Duration) {
        *self.delay.lock().expect("lock") = Some(delay);
    }

    pub fn records(&self) -> Vec<MemoRecord> {
        self.memos.lock().expect("lock").clone()
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn write_error(&self) -> Option<RepoError> {
        self.write_error.lock().expect("lock").clone()
    }
}

#[async_trait]
impl StoreBackend for FakeStore {
    async fn list_all(&self) -> Result<Bytes, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;
        Ok(listing(&self.records()))
    }

    async fn insert(&self, memo: &NewMemo) -> Result<Bytes, RepoError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;
        if let Some(err) = self.write_error() {
            return Err(err);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = MemoRecord {
            id: MemoId::new(id),
            text: memo.text().to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        self.memos.lock().expect("lock").push(record.clone());
        Ok(Bytes::from(serde_json::to_vec(&record).expect("serialize")))
    }

    async fn delete_by_id(&self, id: MemoId) -> Result<Bytes, RepoError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;
        if let Some(err) = self.write_error() {
            return Err(err);
        }
        let mut memos = self.memos.lock().expect("lock");
        let before = memos.len();
        memos.retain(|memo| memo.id != id);
        if memos.len() == before {
            return Err(RepoError::not_found(
                Backend::Store,
                format!("memo {id} not found"),
            ));
        }
        Ok(Bytes::from(
            serde_json::to_vec(&DeletedMemo { id }).expect("serialize"),
        ))
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct FakeStoreConnector {
    store: Arc<FakeStore>,
    failure: Option<RepoError>,
    pub connects: AtomicUsize,
}

impl FakeStoreConnector {
    pub fn new(store: Arc<FakeStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            failure: None,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: RepoError) -> Arc<Self> {
        Arc::new(Self {
            store: FakeStore::empty(),
            failure: Some(err),
            connects: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl StoreConnector for FakeStoreConnector {
    async fn connect(&self) -> Result<Arc<dyn StoreBackend>, RepoError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.store.clone()),
        }
    }
}

/// Records every invalidation signal instead of acting on it.
#[derive(Default)]
pub struct RecordingSink {
    signals: Mutex<Vec<Operation>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn signals(&self) -> Vec<Operation> {
        self.signals.lock().expect("lock").clone()
    }
}

impl InvalidationSink for RecordingSink {
    fn signal(&self, cause: Operation) {
        self.signals.lock().expect("lock").push(cause);
    }
}

pub struct Harness {
    pub cache: Arc<FakeCache>,
    pub cache_connector: Arc<FakeCacheConnector>,
    pub store: Arc<FakeStore>,
    pub store_connector: Arc<FakeStoreConnector>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(cache: Arc<FakeCache>, store: Arc<FakeStore>) -> Self {
        Self {
            cache_connector: FakeCacheConnector::new(cache.clone()),
            store_connector: FakeStoreConnector::new(store.clone()),
            cache,
            store,
            sink: RecordingSink::new(),
        }
    }

    pub async fn select(&self) -> Selection {
        RepositorySelector::new(self.cache_connector.clone(), self.store_connector.clone())
            .select(&OperationContext::unbounded())
            .await
            .expect("selection succeeds")
    }

    pub async fn dispatcher(&self, timeout: Option<Duration>) -> Dispatcher {
        Dispatcher::new(self.select().await, self.sink.clone(), timeout)
    }
}
