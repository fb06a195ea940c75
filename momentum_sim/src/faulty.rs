//! Store wrapper with call accounting and write fault injection.
//!
//! Failures are drawn from a dedicated seeded RNG so enabling faults does not
//! shift the engine's own random stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use momentum_core::{Comment, CommentFilter, CommentInsert, GrowthStore, GrowthTargets, Like, StoreError, Video};
use momentum_env::VideoId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Counters for store traffic seen by a [`FaultyStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
    pub injected_failures: u64,
}

pub struct FaultyStore<S> {
    inner: Arc<S>,
    rng: Mutex<ChaCha8Rng>,
    /// Probability in [0, 1] that a write fails before reaching `inner`
    write_failure_rate: Mutex<f64>,
    reads: AtomicU64,
    writes: AtomicU64,
    injected: AtomicU64,
}

impl<S: GrowthStore> FaultyStore<S> {
    pub fn new(inner: Arc<S>, fault_seed: u64) -> Self {
        Self {
            inner,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(fault_seed)),
            write_failure_rate: Mutex::new(0.0),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            injected: AtomicU64::new(0),
        }
    }

    /// Sets the write failure rate, clamped to [0, 1].
    pub fn set_write_failure_rate(&self, rate: f64) {
        *self.write_failure_rate.lock().unwrap_or_else(PoisonError::into_inner) = rate.clamp(0.0, 1.0);
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            injected_failures: self.injected.load(Ordering::Relaxed),
        }
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a write and decides whether it fails.
    fn write(&self, op: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let rate = *self.write_failure_rate.lock().unwrap_or_else(PoisonError::into_inner);
        if rate <= 0.0 {
            return Ok(());
        }
        let roll = self.rng.lock().unwrap_or_else(PoisonError::into_inner).gen::<f64>();
        if roll < rate {
            self.injected.fetch_add(1, Ordering::Relaxed);
            trace!("Injected failure on {}", op);
            return Err(StoreError::Injected(op.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: GrowthStore> GrowthStore for FaultyStore<S> {
    async fn fetch_video(&self, id: &VideoId) -> Result<Option<Video>, StoreError> {
        self.read();
        self.inner.fetch_video(id).await
    }

    async fn init_targets(&self, id: &VideoId, targets: GrowthTargets) -> Result<GrowthTargets, StoreError> {
        self.write("init_targets")?;
        self.inner.init_targets(id, targets).await
    }

    async fn increment_view_count(&self, id: &VideoId, amount: u64) -> Result<u64, StoreError> {
        self.write("increment_view_count")?;
        self.inner.increment_view_count(id, amount).await
    }

    async fn insert_like(&self, like: Like) -> Result<bool, StoreError> {
        self.write("insert_like")?;
        self.inner.insert_like(like).await
    }

    async fn count_comments(&self, id: &VideoId, filter: CommentFilter<'_>) -> Result<u64, StoreError> {
        self.read();
        self.inner.count_comments(id, filter).await
    }

    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError> {
        self.write("insert_comment")?;
        self.inner.insert_comment(comment).await
    }

    async fn insert_comment_capped(
        &self,
        comment: Comment,
        max_comments: u64,
        counted: CommentFilter<'_>,
    ) -> Result<CommentInsert, StoreError> {
        self.write("insert_comment")?;
        self.inner.insert_comment_capped(comment, max_comments, counted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use momentum_core::MemoryStore;
    use std::time::SystemTime;

    fn wrapped(seed: u64) -> (FaultyStore<MemoryStore>, VideoId) {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(seed);
        store.insert_video(Video::new(id, SystemTime::now()));
        (FaultyStore::new(store, seed), id)
    }

    #[tokio::test]
    async fn test_passthrough_counts_calls() {
        let (store, id) = wrapped(1);

        store.fetch_video(&id).await.unwrap();
        store.increment_view_count(&id, 3).await.unwrap();
        store.count_comments(&id, CommentFilter::All).await.unwrap();

        assert_eq!(
            store.stats(),
            StoreStats { reads: 2, writes: 1, injected_failures: 0 }
        );
        assert_eq!(store.inner().video(&id).unwrap().view_count, 3);
    }

    #[tokio::test]
    async fn test_full_failure_rate_blocks_writes() {
        let (store, id) = wrapped(2);
        store.set_write_failure_rate(1.0);

        let result = store.increment_view_count(&id, 10).await;
        assert!(matches!(result, Err(StoreError::Injected(_))));
        assert_eq!(store.inner().video(&id).unwrap().view_count, 0);

        // Reads are never faulted
        assert!(store.fetch_video(&id).await.unwrap().is_some());
        assert_eq!(store.stats().injected_failures, 1);
    }

    #[tokio::test]
    async fn test_failures_are_seed_deterministic() {
        async fn pattern(seed: u64) -> Vec<bool> {
            let (store, id) = wrapped(seed);
            store.set_write_failure_rate(0.5);
            let mut out = Vec::new();
            for _ in 0..32 {
                out.push(store.increment_view_count(&id, 1).await.is_ok());
            }
            out
        }

        let a = pattern(9).await;
        assert_eq!(a, pattern(9).await);
        assert!(a.iter().any(|ok| *ok));
        assert!(a.iter().any(|ok| !*ok));
    }
}
