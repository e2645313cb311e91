//! # insyte
//!
//! Minimal event tracking on top of Redis hashes.
//!
//! Events are counted per name, either in a daily hash that expires after a
//! retention window or in a persisted hash that never expires. Counts can be
//! read back for one day or for the last N days.
//!
//! ```no_run
//! use insyte::{Event, EventTracker, RedisStore, StoreConfig};
//!
//! # async fn run() -> insyte::TrackerResult<()> {
//! let store = RedisStore::connect(&StoreConfig::from_env()?).await?;
//! let tracker = EventTracker::new(store);
//!
//! tracker.track("page-view", &Event::page("/"), false).await?;
//! let last_week = tracker.retrieve_days("page-view", 7).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `tracker` - Key layout, tracking and retrieval
//! - `storage` - Counter store trait with Redis and in-memory backends
//! - `event` - Open-ended event payload
//! - `date` - `dd/MM/yyyy` formatting and the clock
//! - `config` - Environment-driven configuration
//! - `error` - Error types
//! - `logging` - Tracing setup for the CLI
pub mod config;
pub mod date;
pub mod error;
pub mod event;
pub mod logging;
pub mod storage;
pub mod tracker;

pub use config::{StoreConfig, TrackerConfig};
pub use date::{Clock, FixedClock, SystemClock};
pub use error::{TrackerError, TrackerResult};
pub use event::{Event, EventValue};
pub use storage::{CounterStore, HealthStatus, MemoryStore, RedisStore};
pub use tracker::{EventCount, EventTracker, RetrieveResult};
