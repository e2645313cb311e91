//! Error types for the event tracker

use std::fmt;
use thiserror::Error;

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Tracker error types
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Store command failed
    #[error("Store error: {0}")]
    Store(String),

    /// Connection to the store failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Event serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Date string not in dd/MM/yyyy form
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl TrackerError {
    /// Create a store error
    pub fn store<E: fmt::Display>(err: E) -> Self {
        Self::Store(err.to_string())
    }

    /// Create a connection error
    pub fn connection<E: fmt::Display>(msg: E) -> Self {
        Self::Connection(msg.to_string())
    }

    /// Create a serialization error
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a configuration error
    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Create an invalid date error
    pub fn invalid_date<E: fmt::Display>(input: E) -> Self {
        Self::InvalidDate(input.to_string())
    }

    /// Check if this error came from talking to the store
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Connection(_))
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

impl From<redis::RedisError> for TrackerError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            Self::connection(err)
        } else {
            Self::store(err)
        }
    }
}
