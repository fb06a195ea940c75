//! Production implementation of MomentumContext using Tokio.

use crate::MomentumContext;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Production context backed by Tokio and thread-local entropy.
///
/// Time comes from the system clock, randomness from `thread_rng`.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MomentumContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future);
    }

    fn random_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_tokio_context_spawn_runs_task() {
        let ctx = TokioContext::new();
        let (tx, rx) = oneshot::channel();

        ctx.spawn("probe", async move {
            let _ = tx.send(7u32);
        });

        assert_eq!(rx.await.unwrap(), 7);
    }

    #[test]
    fn test_random_helpers_stay_in_range() {
        let ctx = TokioContext::new();
        for _ in 0..1000 {
            let unit = ctx.random_unit();
            assert!((0.0..1.0).contains(&unit));

            let value = ctx.random_range(200, 1200);
            assert!((200..=1200).contains(&value));

            assert!(ctx.random_index(17) < 17);
        }
        assert_eq!(ctx.random_range(5, 5), 5);
        assert_eq!(ctx.random_index(0), 0);
    }

    #[test]
    fn test_random_range_spanning_all_of_u64() {
        let ctx = TokioContext::new();
        for _ in 0..1000 {
            // Full span must not overflow while sizing the draw
            let _ = ctx.random_range(0, u64::MAX);
        }
        assert_eq!(ctx.random_range(u64::MAX, u64::MAX), u64::MAX);
        assert!(ctx.random_range(u64::MAX - 1, u64::MAX) >= u64::MAX - 1);
    }

    #[test]
    fn test_tokio_context_seed() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.seed(), 0);
    }
}
