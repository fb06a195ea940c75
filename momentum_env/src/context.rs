//! Core environment context trait for Momentum engines.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the growth engine can run
/// in both production (tokio) and simulation (virtual clock) environments.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, `thread_rng`
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// For DST, all methods that would normally introduce non-determinism
/// (time, randomness) are controlled by the implementation.
#[async_trait]
pub trait MomentumContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time.
    ///
    /// Upload ages are measured against this clock.
    /// In simulation, this is derived from virtual clock + epoch offset.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns a uniform sample in `[0, 1)`.
    fn random_unit(&self) -> f64;

    /// Returns a uniform integer in `[low, high]`.
    ///
    /// Callers guarantee `low <= high`.
    fn random_range(&self, low: u64, high: u64) -> u64 {
        let span = (high - low) as f64 + 1.0;
        let offset = (self.random_unit() * span).floor() as u64;
        low + offset.min(high - low)
    }

    /// Returns a uniform index into a collection of `len` elements.
    ///
    /// Returns 0 for an empty collection; callers check emptiness first.
    fn random_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let index = (self.random_unit() * len as f64).floor() as usize;
        index.min(len - 1)
    }

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
