//! Errors raised while setting up or driving a simulation.

use momentum_core::{ConfigError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid growth configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("watch rate must be positive, got {0}")]
    InvalidRate(f64),

    #[error("write failure rate must be within [0, 1], got {0}")]
    InvalidFailureRate(f64),

    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
