//! Memo listing cache maintenance.
//!
//! Writes never touch the cache directly. They publish an invalidation event;
//! the refresher later re-materializes (or evicts) the cached listing:
//!
//! ```toml
//! [cache]
//! url = "redis://127.0.0.1:6379"
//! listing_key = "memos"
//! refresh_mode = "refresh" # or "evict"
//! ```

mod config;
mod events;
mod lock;
mod refresher;
mod trigger;

pub use config::{CacheConfig, RefreshMode};
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use refresher::{CacheRefresher, RefreshOutcome};
pub use trigger::{CacheTrigger, InvalidationSink};
