//! Type definitions for the storage layer

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Result of a backend health check
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend_type: String,
    #[serde(with = "humantime_serde")]
    pub latency: Duration,
    pub details: BTreeMap<String, String>,
}

impl HealthStatus {
    pub fn healthy(backend_type: &str, latency: Duration) -> Self {
        Self {
            healthy: true,
            backend_type: backend_type.to_string(),
            latency,
            details: BTreeMap::new(),
        }
    }

    pub fn unhealthy(backend_type: &str, latency: Duration, error: impl Into<String>) -> Self {
        let mut details = BTreeMap::new();
        details.insert("error".to_string(), error.into());
        Self {
            healthy: false,
            backend_type: backend_type.to_string(),
            latency,
            details,
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}
