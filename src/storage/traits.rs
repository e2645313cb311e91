//! Core trait definitions for the storage layer

use async_trait::async_trait;

use super::types::HealthStatus;
use crate::error::TrackerResult;

/// Hash-of-counters store with per-key expiry
///
/// Mirrors the subset of Redis the tracker relies on. Implementations must
/// make `hincr` atomic; the tracker adds no locking of its own.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add `delta` to `field` in the hash at `key`, creating either
    /// as needed. Returns the new value.
    async fn hincr(&self, key: &str, field: &str, delta: i64) -> TrackerResult<i64>;

    /// All field/value pairs of the hash at `key`, in the backend's
    /// enumeration order. Empty when the key does not exist.
    async fn hgetall(&self, key: &str) -> TrackerResult<Vec<(String, i64)>>;

    /// Set or refresh the TTL of `key`. Returns false if the key does not exist.
    async fn expire(&self, key: &str, seconds: u64) -> TrackerResult<bool>;

    /// Remaining TTL of `key` in seconds, `None` if it has no expiry or does not exist
    async fn ttl(&self, key: &str) -> TrackerResult<Option<i64>>;

    /// Check the health of the backend
    async fn health_check(&self) -> TrackerResult<HealthStatus>;
}
