//! Storage layer for tracked counters
//!
//! The tracker talks to a [`CounterStore`]. [`RedisStore`] is the production
//! backend; [`MemoryStore`] keeps the same semantics in-process.

pub mod backends;
pub mod traits;
pub mod types;

pub use backends::{MemoryStore, RedisStore};
pub use traits::CounterStore;
pub use types::HealthStatus;
