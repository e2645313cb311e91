//! In-memory storage backend
//!
//! Behaves like Redis for the commands the tracker uses: `expire` on a
//! missing key is a no-op, a hash with an elapsed TTL disappears. Time is
//! measured with `tokio::time::Instant` so a paused test runtime can advance it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{TrackerError, TrackerResult};
use crate::storage::traits::CounterStore;
use crate::storage::types::HealthStatus;

#[derive(Debug, Default)]
struct Entry {
    // Insertion order of fields, like a small Redis hash
    fields: Vec<(String, i64)>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory counter store
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail with the given message
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Clear an injected failure
    pub async fn recover(&self) {
        *self.failure.write().await = None;
    }

    /// Live keys currently held
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    async fn check_failure(&self) -> TrackerResult<()> {
        match self.failure.read().await.as_ref() {
            Some(message) => Err(TrackerError::store(message)),
            None => Ok(()),
        }
    }

    fn evict_if_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn hincr(&self, key: &str, field: &str, delta: i64) -> TrackerResult<i64> {
        self.check_failure().await?;

        let mut entries = self.entries.write().await;
        Self::evict_if_expired(&mut entries, key, Instant::now());

        let entry = entries.entry(key.to_string()).or_default();
        let value = match entry.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, count)) => {
                *count = count
                    .checked_add(delta)
                    .ok_or_else(|| TrackerError::store("increment or decrement would overflow"))?;
                *count
            }
            None => {
                entry.fields.push((field.to_string(), delta));
                delta
            }
        };

        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> TrackerResult<Vec<(String, i64)>> {
        self.check_failure().await?;

        let mut entries = self.entries.write().await;
        Self::evict_if_expired(&mut entries, key, Instant::now());

        Ok(entries
            .get(key)
            .map(|entry| entry.fields.clone())
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, seconds: u64) -> TrackerResult<bool> {
        self.check_failure().await?;

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::evict_if_expired(&mut entries, key, now);

        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(now + Duration::from_secs(seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> TrackerResult<Option<i64>> {
        self.check_failure().await?;

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::evict_if_expired(&mut entries, key, now);

        Ok(entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now).as_secs_f64().round() as i64))
    }

    async fn health_check(&self) -> TrackerResult<HealthStatus> {
        let keys = self.keys().await.len();
        let status = match self.failure.read().await.as_ref() {
            Some(message) => HealthStatus::unhealthy("memory", Duration::ZERO, message.clone()),
            None => HealthStatus::healthy("memory", Duration::ZERO),
        };
        Ok(status.with_detail("keys", keys.to_string()))
    }
}
