//! Redis-backed cache holding the serialized memo listing under one key.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use tracing::debug;

use crate::application::repos::{
    Backend, CacheBackend, CacheConnector, CachePopulator, ErrorKind, RepoError,
};

fn map_redis_error(err: RedisError, fallback: ErrorKind) -> RepoError {
    let kind = if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
    {
        ErrorKind::ConnectionFailure
    } else if err.is_timeout() {
        ErrorKind::Cancelled
    } else {
        fallback
    };
    RepoError::new(kind, Backend::Cache.as_str(), err.to_string())
}

#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    listing_key: Arc<str>,
}

impl RedisCache {
    pub async fn open(url: &str, listing_key: &str) -> Result<Self, RepoError> {
        let client = Client::open(url)
            .map_err(|err| RepoError::connection(Backend::Cache, err.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| RepoError::connection(Backend::Cache, err.to_string()))?;
        Ok(Self {
            manager,
            listing_key: Arc::from(listing_key),
        })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn exists(&self) -> Result<bool, RepoError> {
        let mut conn = self.manager.clone();
        conn.exists::<_, bool>(&*self.listing_key)
            .await
            .map_err(|err| map_redis_error(err, ErrorKind::ReadFailure))
    }

    async fn list_all(&self) -> Result<Bytes, RepoError> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn
            .get(&*self.listing_key)
            .await
            .map_err(|err| map_redis_error(err, ErrorKind::ReadFailure))?;

        value.map(Bytes::from).ok_or_else(|| {
            RepoError::read(
                Backend::Cache,
                format!("cached listing `{}` is missing", self.listing_key),
            )
        })
    }
}

#[async_trait]
impl CachePopulator for RedisCache {
    async fn store_listing(&self, listing: Bytes) -> Result<(), RepoError> {
        let mut conn = self.manager.clone();
        let bytes = listing.len();
        conn.set::<_, _, ()>(&*self.listing_key, listing.to_vec())
            .await
            .map_err(|err| map_redis_error(err, ErrorKind::WriteFailure))?;
        debug!(key = %self.listing_key, bytes, "cached listing stored");
        Ok(())
    }

    async fn evict_listing(&self) -> Result<(), RepoError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(&*self.listing_key)
            .await
            .map_err(|err| map_redis_error(err, ErrorKind::WriteFailure))?;
        debug!(key = %self.listing_key, "cached listing evicted");
        Ok(())
    }
}

/// Connects to Redis for the repository selector.
pub struct RedisConnector {
    url: String,
    listing_key: String,
}

impl RedisConnector {
    pub fn new(url: impl Into<String>, listing_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            listing_key: listing_key.into(),
        }
    }

    /// Open a connection usable for population as well as reads.
    pub async fn open(&self) -> Result<RedisCache, RepoError> {
        RedisCache::open(&self.url, &self.listing_key).await
    }
}

#[async_trait]
impl CacheConnector for RedisConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheBackend>, RepoError> {
        let cache = self.open().await?;
        Ok(Arc::new(cache))
    }
}
