//! Cache refresher: drains invalidation events and repairs the cached listing.
//!
//! This is the population side of the cache. Request handlers never wait on
//! it; failures are logged and counted, never propagated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::repos::{Backend, CachePopulator, OperationContext, RepoError};
use crate::application::selector::RepositoryHandle;

use super::config::{CacheConfig, RefreshMode};
use super::events::{EventKind, EventQueue};

const METRIC_REFRESH_TOTAL: &str = "memoapp_cache_refresh_total";
const METRIC_REFRESH_MS: &str = "memoapp_cache_refresh_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No pending events.
    Idle,
    Refreshed { events: usize },
    Evicted { events: usize },
    Failed { events: usize },
}

pub struct CacheRefresher {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    handle: RepositoryHandle,
    populator: Arc<dyn CachePopulator>,
    mode: RefreshMode,
    timeout: Option<Duration>,
    // Serializes runs so an older listing never overwrites a newer one.
    running: Mutex<()>,
}

impl CacheRefresher {
    pub fn new(
        config: CacheConfig,
        queue: Arc<EventQueue>,
        handle: RepositoryHandle,
        populator: Arc<dyn CachePopulator>,
    ) -> Self {
        // A cache-backed handle never re-selects, so an evicted key would fail
        // every later read.
        let mode = match (config.refresh_mode, handle.backend()) {
            (RefreshMode::Evict, Backend::Cache) => {
                warn!(
                    configured = RefreshMode::Evict.as_str(),
                    "Reads are served from the cache; refreshing the listing instead of evicting"
                );
                RefreshMode::Refresh
            }
            (mode, _) => mode,
        };

        Self {
            config,
            queue,
            handle,
            populator,
            mode,
            timeout: None,
            running: Mutex::new(()),
        }
    }

    /// Bound every refresh run by `timeout`; an expired run counts as failed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mode applied to invalidation events for this process.
    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// Drain one batch of events and apply a single refresh for all of them.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> RefreshOutcome {
        let _running = self.running.lock().await;

        let events = self.queue.drain(self.config.consume_batch_limit);
        if events.is_empty() {
            return RefreshOutcome::Idle;
        }

        let started_at = Instant::now();
        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|event| event.id).collect();
        let warm_requested = events
            .iter()
            .any(|event| event.kind == EventKind::WarmRequested);
        let mode = if warm_requested {
            RefreshMode::Refresh
        } else {
            self.mode
        };

        info!(
            event_count,
            event_ids = ?event_ids,
            mode = mode.as_str(),
            "Cache refresh starting"
        );

        let ctx = OperationContext::from_timeout(self.timeout);
        let result = match mode {
            RefreshMode::Refresh => self.refresh(&ctx).await,
            RefreshMode::Evict => ctx.run(Backend::Cache, self.populator.evict_listing()).await,
        };

        histogram!(METRIC_REFRESH_MS, "mode" => mode.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(()) => {
                counter!(METRIC_REFRESH_TOTAL, "outcome" => "ok").increment(1);
                info!(event_count, mode = mode.as_str(), "Cache refresh complete");
                match mode {
                    RefreshMode::Refresh => RefreshOutcome::Refreshed {
                        events: event_count,
                    },
                    RefreshMode::Evict => RefreshOutcome::Evicted {
                        events: event_count,
                    },
                }
            }
            Err(err) => {
                counter!(METRIC_REFRESH_TOTAL, "outcome" => "failed").increment(1);
                warn!(
                    error = %err,
                    kind = %err.kind(),
                    component = err.component(),
                    event_count,
                    "Cache refresh failed; cached listing may stay stale"
                );
                RefreshOutcome::Failed {
                    events: event_count,
                }
            }
        }
    }

    async fn refresh(&self, ctx: &OperationContext) -> Result<(), RepoError> {
        let listing = self.handle.list_from_store(ctx).await?;
        ctx.run(Backend::Cache, self.populator.store_listing(listing)).await
    }
}
