//! Redis storage backend implementation

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::storage::traits::CounterStore;
use crate::storage::types::HealthStatus;

/// Redis storage backend
#[derive(Clone)]
pub struct RedisStore {
    pool: Arc<Pool>,
    config: StoreConfig,
}

impl RedisStore {
    /// Create a pooled backend and verify the connection
    pub async fn connect(config: &StoreConfig) -> TrackerResult<Self> {
        info!("Initializing Redis backend at {}", redacted_endpoint(config));

        let store = Self {
            pool: Arc::new(build_pool(config)?),
            config: config.clone(),
        };

        // Fail at startup rather than on the first tracked event
        let mut conn = store.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(store)
    }

    async fn connection(&self) -> TrackerResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| TrackerError::connection(format!("Failed to connect to Redis: {e}")))
    }
}

/// Create the connection pool without opening a connection
fn build_pool(config: &StoreConfig) -> TrackerResult<Pool> {
    let mut pool_config = PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(config.timeout);
    pool_config.timeouts.create = Some(config.timeout);
    pool_config.timeouts.recycle = Some(config.timeout);

    let mut redis_config = Config::from_url(config.connection_url()?);
    redis_config.pool = Some(pool_config);

    redis_config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| TrackerError::connection(format!("Failed to create Redis pool: {e}")))
}

fn redacted_endpoint(config: &StoreConfig) -> String {
    format!(
        "{}://{}:{}",
        config.url.scheme(),
        config.url.host_str().unwrap_or_default(),
        config.url.port().unwrap_or(6379)
    )
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn hincr(&self, key: &str, field: &str, delta: i64) -> TrackerResult<i64> {
        debug!("HINCRBY {} by {}", key, delta);

        let mut conn = self.connection().await?;
        let value: i64 = conn.hincr(key, field, delta).await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> TrackerResult<Vec<(String, i64)>> {
        debug!("HGETALL {}", key);

        let mut conn = self.connection().await?;
        let fields: Vec<(String, i64)> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn expire(&self, key: &str, seconds: u64) -> TrackerResult<bool> {
        debug!("EXPIRE {} {}", key, seconds);

        let seconds = i64::try_from(seconds)
            .map_err(|_| TrackerError::store(format!("expiry out of range: {seconds}")))?;
        let mut conn = self.connection().await?;
        let applied: bool = conn.expire(key, seconds).await?;
        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> TrackerResult<Option<i64>> {
        let mut conn = self.connection().await?;
        let ttl: i64 = conn.ttl(key).await?;

        // -2: no such key, -1: no expiry
        Ok((ttl >= 0).then_some(ttl))
    }

    async fn health_check(&self) -> TrackerResult<HealthStatus> {
        debug!("Performing Redis health check");

        let start = Instant::now();
        let endpoint = redacted_endpoint(&self.config);

        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                return Ok(HealthStatus::unhealthy("redis", start.elapsed(), e.to_string())
                    .with_detail("endpoint", endpoint));
            }
        };

        let pong: Result<String, redis::RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        let status = match pong {
            Ok(response) if response == "PONG" => {
                let latency = start.elapsed();
                let info: String = redis::cmd("INFO")
                    .arg("server")
                    .query_async(&mut conn)
                    .await
                    .unwrap_or_default();

                let mut status = HealthStatus::healthy("redis", latency)
                    .with_detail("pool_size", self.config.pool_size.to_string());
                if let Some(version) = info
                    .lines()
                    .find_map(|line| line.strip_prefix("redis_version:"))
                {
                    status = status.with_detail("redis_version", version.trim());
                }
                status
            }
            Ok(response) => {
                error!("Unexpected Redis PING response: {}", response);
                HealthStatus::unhealthy(
                    "redis",
                    start.elapsed(),
                    format!("Unexpected PING response: {response}"),
                )
            }
            Err(e) => {
                error!("Redis PING failed: {}", e);
                HealthStatus::unhealthy("redis", start.elapsed(), e.to_string())
            }
        };

        Ok(status.with_detail("endpoint", endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_endpoint_hides_token() {
        let config = StoreConfig::new("rediss://cache.example.com:6380", "hunter2").unwrap();
        let endpoint = redacted_endpoint(&config);

        assert_eq!(endpoint, "rediss://cache.example.com:6380");
        assert!(!endpoint.contains("hunter2"));
    }

    #[test]
    fn test_redacted_endpoint_default_port() {
        let config = StoreConfig::new("redis://localhost", "token").unwrap();
        assert_eq!(redacted_endpoint(&config), "redis://localhost:6379");
    }

    #[tokio::test]
    async fn test_pool_accepts_tls_endpoint() {
        let config = StoreConfig::new("rediss://127.0.0.1:1", "token")
            .unwrap()
            .with_pool_size(2);

        let pool = build_pool(&config).unwrap();
        assert_eq!(pool.status().max_size, 2);
    }

    #[tokio::test]
    async fn test_pool_accepts_plain_endpoint() {
        let config = StoreConfig::new("redis://127.0.0.1:1", "token").unwrap();
        assert!(build_pool(&config).is_ok());
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis at INSYTE_REDIS_URL"]
    async fn test_redis_round_trip() {
        let config = StoreConfig::from_env().unwrap();
        let store = RedisStore::connect(&config).await.unwrap();
        let key = format!("insyte::test::{}", std::process::id());

        assert_eq!(store.hincr(&key, "f", 1).await.unwrap(), 1);
        assert_eq!(store.hincr(&key, "f", 1).await.unwrap(), 2);
        assert!(store.expire(&key, 30).await.unwrap());
        assert!(store.ttl(&key).await.unwrap().is_some_and(|t| t <= 30));
        assert_eq!(
            store.hgetall(&key).await.unwrap(),
            vec![("f".to_string(), 2)]
        );
        assert!(store.health_check().await.unwrap().healthy);
    }
}
