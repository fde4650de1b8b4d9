//! Cache refresh configuration.

use std::str::FromStr;

use serde::Deserialize;
use serde::de::{
    IntoDeserializer,
    value::{Error as ValueError, StrDeserializer},
};

const DEFAULT_LISTING_KEY: &str = "memos";
const DEFAULT_AUTO_CONSUME_INTERVAL_MS: u64 = 5000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

/// What the refresher does with the cached listing after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Re-materialize the listing from the store.
    Refresh,
    /// Drop the cached listing; the next process start falls back to the store.
    Evict,
}

impl RefreshMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshMode::Refresh => "refresh",
            RefreshMode::Evict => "evict",
        }
    }
}

impl FromStr for RefreshMode {
    type Err = ValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let deserializer: StrDeserializer<'_, ValueError> = value.trim().into_deserializer();
        Self::deserialize(deserializer)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Key holding the serialized listing.
    pub listing_key: String,
    pub refresh_mode: RefreshMode,
    /// Auto-consume interval (ms) for events left over after a batch.
    pub auto_consume_interval_ms: u64,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_key: DEFAULT_LISTING_KEY.to_string(),
            refresh_mode: RefreshMode::Refresh,
            auto_consume_interval_ms: DEFAULT_AUTO_CONSUME_INTERVAL_MS,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            listing_key: settings.listing_key.clone(),
            refresh_mode: settings.refresh_mode,
            auto_consume_interval_ms: settings.auto_consume_interval.as_millis() as u64,
            consume_batch_limit: settings.consume_batch_limit.get(),
        }
    }
}
