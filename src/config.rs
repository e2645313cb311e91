//! Store and tracker configuration
//!
//! Connection settings come from the environment and are validated eagerly so
//! a process can refuse to start with a missing or malformed endpoint.

use std::time::Duration;
use url::Url;

use crate::error::{TrackerError, TrackerResult};

pub const URL_VAR: &str = "INSYTE_REDIS_URL";
pub const TOKEN_VAR: &str = "INSYTE_REDIS_TOKEN";
pub const POOL_SIZE_VAR: &str = "INSYTE_REDIS_POOL_SIZE";
pub const RETENTION_VAR: &str = "INSYTE_RETENTION_SECS";

/// Seven days
pub const DEFAULT_RETENTION_SECS: u64 = 604_800;

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Endpoint, `redis://` or `rediss://`
    pub url: Url,
    /// Access token, sent as the connection password
    pub token: String,
    /// Maximum pooled connections
    pub pool_size: usize,
    /// Pool wait/create/recycle timeout
    pub timeout: Duration,
}

impl StoreConfig {
    /// Build and validate a configuration
    pub fn new(url: &str, token: &str) -> TrackerResult<Self> {
        let url = parse_endpoint(url)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(TrackerError::configuration(format!("{TOKEN_VAR} is empty")));
        }

        Ok(Self {
            url,
            token: token.to_string(),
            pool_size: default_pool_size(),
            timeout: default_timeout(),
        })
    }

    /// Create configuration from environment variables
    pub fn from_env() -> TrackerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> TrackerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_VAR)
            .ok_or_else(|| TrackerError::configuration(format!("{URL_VAR} is not set")))?;
        let token = lookup(TOKEN_VAR)
            .ok_or_else(|| TrackerError::configuration(format!("{TOKEN_VAR} is not set")))?;

        let mut config = Self::new(&url, &token)?;
        if let Some(raw) = lookup(POOL_SIZE_VAR) {
            config.pool_size = parse_positive(POOL_SIZE_VAR, &raw)? as usize;
        }
        Ok(config)
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Endpoint with the token filled in as password
    pub fn connection_url(&self) -> TrackerResult<String> {
        let mut url = self.url.clone();
        url.set_password(Some(&self.token)).map_err(|_| {
            TrackerError::configuration(format!("{URL_VAR} cannot carry a password"))
        })?;
        Ok(url.to_string())
    }
}

/// Event tracker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// TTL in seconds applied to ephemeral keys
    pub retention: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION_SECS,
        }
    }
}

impl TrackerConfig {
    /// Settings with a custom retention; zero is rejected since `EXPIRE 0`
    /// would delete a day's counters right after they are written
    pub fn with_retention(retention: u64) -> TrackerResult<Self> {
        if retention == 0 {
            return Err(TrackerError::configuration("retention must be at least one second"));
        }
        Ok(Self { retention })
    }

    /// Create configuration from environment variables
    pub fn from_env() -> TrackerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> TrackerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(RETENTION_VAR) {
            Some(raw) => Self::with_retention(parse_positive(RETENTION_VAR, &raw)?),
            None => Ok(Self::default()),
        }
    }
}

fn parse_endpoint(raw: &str) -> TrackerResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| TrackerError::configuration(format!("{URL_VAR} is not a valid URL: {e}")))?;

    if !matches!(url.scheme(), "redis" | "rediss") {
        return Err(TrackerError::configuration(format!(
            "{URL_VAR} must use the redis:// or rediss:// scheme, got {}://",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TrackerError::configuration(format!("{URL_VAR} has no host")));
    }

    Ok(url)
}

fn parse_positive(name: &str, raw: &str) -> TrackerResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(TrackerError::configuration(format!(
            "{name} must be a positive integer, got {raw:?}"
        ))),
    }
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
