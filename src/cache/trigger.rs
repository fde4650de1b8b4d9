//! Cache trigger service.
//!
//! Publishes invalidation events and hands them to the refresher on a
//! background task so the caller never waits for the cache.

use std::sync::Arc;

use metrics::counter;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::application::dispatch::Operation;

use super::events::{EventKind, EventQueue};
use super::refresher::{CacheRefresher, RefreshOutcome};

const METRIC_SIGNALS_TOTAL: &str = "memoapp_cache_invalidation_signals_total";

/// Receiver of best-effort "the cached listing may be stale" notifications.
///
/// Implementations must not block and must not fail the caller.
pub trait InvalidationSink: Send + Sync {
    fn signal(&self, cause: Operation);
}

pub struct CacheTrigger {
    queue: Arc<EventQueue>,
    refresher: Arc<CacheRefresher>,
}

impl CacheTrigger {
    pub fn new(queue: Arc<EventQueue>, refresher: Arc<CacheRefresher>) -> Self {
        Self { queue, refresher }
    }

    /// Queue an event and schedule a refresh without waiting for it.
    ///
    /// Outside a Tokio runtime the event stays queued for the periodic
    /// consumer.
    pub fn publish(&self, kind: EventKind) {
        self.queue.publish(kind);

        match Handle::try_current() {
            Ok(runtime) => {
                let refresher = self.refresher.clone();
                runtime.spawn(async move {
                    let outcome = refresher.consume().await;
                    debug!(?outcome, "Background cache refresh finished");
                });
            }
            Err(_) => {
                warn!("No async runtime available; cache event left for periodic consumption");
            }
        }
    }

    /// Materialize the listing now and wait for the result.
    pub async fn warm_now(&self) -> RefreshOutcome {
        self.queue.publish(EventKind::WarmRequested);
        self.refresher.consume().await
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn refresher(&self) -> &Arc<CacheRefresher> {
        &self.refresher
    }
}

impl InvalidationSink for CacheTrigger {
    fn signal(&self, cause: Operation) {
        counter!(METRIC_SIGNALS_TOTAL, "cause" => cause.as_str()).increment(1);
        self.publish(EventKind::ListingStale { cause });
    }
}
