//! Error types for stores and configuration.

use momentum_env::VideoId;
use thiserror::Error;

/// Failures surfaced by a [`GrowthStore`](crate::GrowthStore) or
/// [`BotDirectory`](crate::BotDirectory).
///
/// The engine never propagates these; they are logged and swallowed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Video not found: {0}")]
    NotFound(VideoId),

    #[error("Storage error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Raised by fault-injecting wrappers in simulation.
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        Self::Backend(format!("sled: {}", err))
    }
}

/// Invalid [`GrowthConfig`](crate::GrowthConfig) values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid range for {name}: {min} > {max}")]
    InvalidRange { name: &'static str, min: u64, max: u64 },

    #[error("Upper bound for {name} is {max}, above the drawable limit {limit}")]
    TargetTooLarge { name: &'static str, max: u64, limit: u64 },

    #[error("Probability {name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Growth window must be positive and finite, got {0} hours")]
    InvalidWindow(f64),

    #[error("View jitter must be non-negative and finite, got {0}")]
    InvalidJitter(f64),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidFlag { var: &'static str, value: String },
}
