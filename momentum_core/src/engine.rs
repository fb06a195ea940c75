//! The growth engine - one best-effort pass per watch event.
//!
//! Each call reads the video, lazily draws its targets, nudges the view
//! counter toward where the momentum curve says it should be, and maybe adds
//! one bot like and one bot comment. Every failure is logged and swallowed:
//! the caller (the watch page) must never notice this engine exists.

use std::sync::Arc;
use std::time::SystemTime;

use momentum_env::{MomentumContext, VideoId};
use tracing::{debug, info, warn};

use crate::bots::{inject_comment, inject_like, InjectionOutcome};
use crate::config::GrowthConfig;
use crate::curve;
use crate::error::ConfigError;
use crate::model::GrowthTargets;
use crate::store::{BotDirectory, GrowthStore};

const SECS_PER_HOUR: f64 = 3600.0;

/// What happened on a single [`GrowthEngine::apply_growth_boost`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum BoostOutcome {
    /// Kill switch off; nothing was read or written
    Disabled,
    /// Video missing or unreadable
    VideoUnavailable,
    /// Upload is older than the growth window
    WindowClosed { hours_since_upload: f64 },
    /// Targets could not be initialized, so nothing else was attempted
    TargetsUnavailable,
    Applied(BoostReport),
}

impl BoostOutcome {
    pub fn report(&self) -> Option<&BoostReport> {
        match self {
            BoostOutcome::Applied(report) => Some(report),
            _ => None,
        }
    }
}

/// Details of a call that got past the window check.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostReport {
    pub hours_since_upload: f64,
    pub curve_factor: f64,
    pub targets: GrowthTargets,
    /// This call drew targets (the store may have kept an earlier draw)
    pub initialized_targets: bool,
    pub expected_views: u64,
    /// Views added by this call; 0 when on track or when the write failed
    pub views_added: u64,
    pub view_update_failed: bool,
    pub like: InjectionOutcome,
    pub comment: InjectionOutcome,
}

/// Synthetic engagement scheduler.
///
/// Generic over the context, store and bot directory so the same engine runs
/// in production or in the deterministic simulator.
pub struct GrowthEngine<Ctx, S, B>
where
    Ctx: MomentumContext,
    S: GrowthStore,
    B: BotDirectory,
{
    context: Arc<Ctx>,
    store: Arc<S>,
    bots: Arc<B>,
    config: GrowthConfig,
}

impl<Ctx, S, B> GrowthEngine<Ctx, S, B>
where
    Ctx: MomentumContext,
    S: GrowthStore,
    B: BotDirectory,
{
    pub fn new(context: Arc<Ctx>, store: Arc<S>, bots: Arc<B>, config: GrowthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            context,
            store,
            bots,
            config,
        })
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    /// Fractional hours since `created_at`; uploads "in the future" count as 0.
    pub fn hours_since(&self, created_at: SystemTime) -> f64 {
        self.context
            .system_time()
            .duration_since(created_at)
            .map(|age| age.as_secs_f64() / SECS_PER_HOUR)
            .unwrap_or(0.0)
    }

    /// Fire-and-forget variant for the watch path.
    pub fn spawn_boost(self: &Arc<Self>, video_id: VideoId) {
        let engine = Arc::clone(self);
        self.context.spawn("growth-boost", async move {
            engine.apply_growth_boost(&video_id).await;
        });
    }

    /// Runs one growth pass for `video_id`. Never fails.
    pub async fn apply_growth_boost(&self, video_id: &VideoId) -> BoostOutcome {
        if !self.config.enabled {
            return BoostOutcome::Disabled;
        }

        let video = match self.store.fetch_video(video_id).await {
            Ok(Some(video)) => video,
            Ok(None) => {
                debug!("Growth skipped: video {} not found", video_id);
                return BoostOutcome::VideoUnavailable;
            }
            Err(e) => {
                warn!("Growth skipped: failed to read video {}: {}", video_id, e);
                return BoostOutcome::VideoUnavailable;
            }
        };

        let window = self.config.window_hours;
        let hours_since_upload = self.hours_since(video.created_at);
        if hours_since_upload > window {
            return BoostOutcome::WindowClosed { hours_since_upload };
        }

        let (targets, initialized_targets) = match video.targets() {
            Some(targets) => (targets, false),
            None => match self.initialize_targets(video_id).await {
                Some(targets) => (targets, true),
                None => return BoostOutcome::TargetsUnavailable,
            },
        };

        let progress = curve::progress(hours_since_upload, window);
        let expected_views = curve::expected_views(targets.views, progress);
        let curve_factor = curve::bell_curve_factor(hours_since_upload, window);

        let mut views_added = 0;
        let mut view_update_failed = false;
        if video.view_count < expected_views {
            let jitter = self.context.random_unit() * self.config.max_view_jitter;
            let amount = curve::catch_up_amount(targets.views, window, curve_factor, jitter);
            match self.store.increment_view_count(video_id, amount).await {
                Ok(count) => {
                    views_added = amount;
                    debug!("Video {} +{} views -> {} (expected {})", video_id, amount, count, expected_views);
                }
                Err(e) => {
                    view_update_failed = true;
                    warn!("Failed to add views to {}: {}", video_id, e);
                }
            }
        }

        let like = if self.roll(self.config.like_probability * curve_factor) {
            inject_like(self.context.as_ref(), self.store.as_ref(), self.bots.as_ref(), video_id)
                .await
                .unwrap_or_else(|e| {
                    warn!("Bot like on {} failed: {}", video_id, e);
                    InjectionOutcome::Failed
                })
        } else {
            InjectionOutcome::NotRolled
        };

        let comment = if self.roll(self.config.comment_probability * curve_factor) {
            inject_comment(
                self.context.as_ref(),
                self.store.as_ref(),
                self.bots.as_ref(),
                &self.config,
                video_id,
            )
            .await
            .unwrap_or_else(|e| {
                warn!("Bot comment on {} failed: {}", video_id, e);
                InjectionOutcome::Failed
            })
        } else {
            InjectionOutcome::NotRolled
        };

        BoostOutcome::Applied(BoostReport {
            hours_since_upload,
            curve_factor,
            targets,
            initialized_targets,
            expected_views,
            views_added,
            view_update_failed,
            like,
            comment,
        })
    }

    async fn initialize_targets(&self, video_id: &VideoId) -> Option<GrowthTargets> {
        let drawn = GrowthTargets {
            views: self.context.random_range(self.config.min_views, self.config.max_views),
            likes: self.context.random_range(self.config.min_likes, self.config.max_likes),
        };

        match self.store.init_targets(video_id, drawn).await {
            Ok(targets) => {
                if targets == drawn {
                    info!("Growth targets for {}: {} views, {} likes", video_id, targets.views, targets.likes);
                } else {
                    debug!("Growth targets for {} already set by a concurrent watch", video_id);
                }
                Some(targets)
            }
            Err(e) => {
                warn!("Failed to initialize growth targets for {}: {}", video_id, e);
                None
            }
        }
    }

    fn roll(&self, probability: f64) -> bool {
        self.context.random_unit() < probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory_store::MemoryStore;
    use crate::model::{Bot, Comment, Like, Video};
    use crate::store::{CommentFilter, StoreEvent};
    use async_trait::async_trait;
    use momentum_env::TokioContext;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(3600);

    /// Frozen clock with scripted random draws (0.999 once the script runs out).
    struct ScriptedContext {
        now: SystemTime,
        rolls: Mutex<VecDeque<f64>>,
    }

    impl ScriptedContext {
        fn new(rolls: &[f64]) -> Self {
            Self {
                now: SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200),
                rolls: Mutex::new(rolls.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl MomentumContext for ScriptedContext {
        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn system_time(&self) -> SystemTime {
            self.now
        }

        async fn sleep(&self, _duration: Duration) {}

        fn spawn<F>(&self, _name: &str, future: F)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            tokio::spawn(future);
        }

        fn random_unit(&self) -> f64 {
            self.rolls.lock().unwrap().pop_front().unwrap_or(0.999)
        }

        fn seed(&self) -> u64 {
            0
        }
    }

    /// Counts every call; optionally fails all writes.
    struct ProbeStore {
        inner: MemoryStore,
        calls: AtomicUsize,
        fail_writes: bool,
    }

    impl ProbeStore {
        fn new(fail_writes: bool) -> Self {
            Self { inner: MemoryStore::new(), calls: AtomicUsize::new(0), fail_writes }
        }

        fn touch(&self, write: bool) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if write && self.fail_writes {
                return Err(StoreError::Injected("write refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GrowthStore for ProbeStore {
        async fn fetch_video(&self, id: &VideoId) -> Result<Option<Video>, StoreError> {
            self.touch(false)?;
            self.inner.fetch_video(id).await
        }

        async fn init_targets(&self, id: &VideoId, targets: GrowthTargets) -> Result<GrowthTargets, StoreError> {
            self.touch(true)?;
            self.inner.init_targets(id, targets).await
        }

        async fn increment_view_count(&self, id: &VideoId, amount: u64) -> Result<u64, StoreError> {
            self.touch(true)?;
            self.inner.increment_view_count(id, amount).await
        }

        async fn insert_like(&self, like: Like) -> Result<bool, StoreError> {
            self.touch(true)?;
            self.inner.insert_like(like).await
        }

        async fn count_comments(&self, id: &VideoId, filter: CommentFilter<'_>) -> Result<u64, StoreError> {
            self.touch(false)?;
            self.inner.count_comments(id, filter).await
        }

        async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError> {
            self.touch(true)?;
            self.inner.insert_comment(comment).await
        }
    }

    #[async_trait]
    impl BotDirectory for ProbeStore {
        async fn list_bots(&self) -> Result<Vec<Bot>, StoreError> {
            self.touch(false)?;
            self.inner.list_bots().await
        }
    }

    fn engine_with<S: GrowthStore + BotDirectory>(
        rolls: &[f64],
        store: Arc<S>,
        config: GrowthConfig,
    ) -> GrowthEngine<ScriptedContext, S, S> {
        GrowthEngine::new(Arc::new(ScriptedContext::new(rolls)), Arc::clone(&store), store, config).unwrap()
    }

    fn uploaded(ctx_now: SystemTime, hours_ago: f64) -> SystemTime {
        ctx_now - HOUR.mul_f64(hours_ago)
    }

    fn now() -> SystemTime {
        ScriptedContext::new(&[]).now
    }

    #[tokio::test]
    async fn test_disabled_engine_touches_nothing() {
        let store = Arc::new(ProbeStore::new(false));
        let id = VideoId::from_seed(1);
        store.inner.insert_video(Video::new(id, now()));

        let engine = engine_with(&[], Arc::clone(&store), GrowthConfig::default());
        assert_eq!(engine.apply_growth_boost(&id).await, BoostOutcome::Disabled);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_video_is_silent() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(&[], store, GrowthConfig::enabled());
        assert_eq!(engine.apply_growth_boost(&VideoId::from_seed(8)).await, BoostOutcome::VideoUnavailable);
    }

    #[tokio::test]
    async fn test_closed_window_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(2);
        let video = Video::new(id, uploaded(now(), 13.0));
        store.insert_video(video.clone());
        store.register_bot("NoScope360");

        let engine = engine_with(&[0.0; 8], Arc::clone(&store), GrowthConfig::enabled());
        let outcome = engine.apply_growth_boost(&id).await;

        assert!(matches!(outcome, BoostOutcome::WindowClosed { hours_since_upload } if hours_since_upload > 12.9));
        assert_eq!(store.video(&id), Some(video));
        assert!(store.likes_for(&id).is_empty());
        assert!(store.comments_for(&id).is_empty());
    }

    #[tokio::test]
    async fn test_first_watch_initializes_targets() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(3);
        store.insert_video(Video::new(id, now()));

        // views draw, likes draw, then rolls that miss
        let engine = engine_with(&[0.5, 0.5], Arc::clone(&store), GrowthConfig::enabled());
        let outcome = engine.apply_growth_boost(&id).await;
        let report = outcome.report().unwrap();

        assert!(report.initialized_targets);
        assert_eq!(report.targets, GrowthTargets { views: 700, likes: 63 });
        assert_eq!(report.expected_views, 0);
        assert_eq!(report.views_added, 0);

        let stored = store.video(&id).unwrap();
        assert!(stored.boosted);
        assert_eq!((stored.target_views, stored.target_likes), (700, 63));
        assert_eq!(stored.view_count, 0);
    }

    #[tokio::test]
    async fn test_peak_catch_up_increment() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(4);
        let targets = GrowthTargets { views: 1000, likes: 50 };
        store.insert_video(Video::new(id, uploaded(now(), 6.0)).with_targets(targets).with_view_count(100));

        // zero jitter, then like/comment rolls miss
        let engine = engine_with(&[0.0], Arc::clone(&store), GrowthConfig::enabled());
        let report = engine.apply_growth_boost(&id).await.report().cloned().unwrap();

        assert!(!report.initialized_targets);
        assert_eq!(report.expected_views, 500);
        assert_eq!(report.curve_factor, 1.0);
        assert_eq!(report.views_added, 84);
        assert_eq!(store.video(&id).unwrap().view_count, 184);
        assert_eq!(report.like, InjectionOutcome::NotRolled);
        assert_eq!(report.comment, InjectionOutcome::NotRolled);
    }

    #[tokio::test]
    async fn test_on_track_video_gets_no_views() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(5);
        let targets = GrowthTargets { views: 1000, likes: 50 };
        store.insert_video(Video::new(id, uploaded(now(), 6.0)).with_targets(targets).with_view_count(600));

        let engine = engine_with(&[], Arc::clone(&store), GrowthConfig::enabled());
        let report = engine.apply_growth_boost(&id).await.report().cloned().unwrap();

        assert_eq!(report.views_added, 0);
        assert_eq!(store.video(&id).unwrap().view_count, 600);
    }

    #[tokio::test]
    async fn test_targets_stable_across_calls() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(6);
        store.insert_video(Video::new(id, uploaded(now(), 2.0)));

        let rolls: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37) % 1.0).collect();
        let engine = engine_with(&rolls, Arc::clone(&store), GrowthConfig::enabled());

        let first = engine.apply_growth_boost(&id).await.report().cloned().unwrap().targets;
        let mut last_views = store.video(&id).unwrap().view_count;
        for _ in 0..20 {
            let report = engine.apply_growth_boost(&id).await.report().cloned().unwrap();
            assert_eq!(report.targets, first);
            assert!(!report.initialized_targets);

            let views = store.video(&id).unwrap().view_count;
            assert!(views >= last_views);
            last_views = views;
        }
    }

    #[tokio::test]
    async fn test_successful_rolls_add_like_and_comment() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(7);
        let targets = GrowthTargets { views: 1000, likes: 50 };
        store.insert_video(Video::new(id, uploaded(now(), 6.0)).with_targets(targets).with_view_count(900));
        let bot = store.register_bot("XP_Grinder");

        // like roll, like pick, comment roll, comment pick, phrase pick
        let engine = engine_with(&[0.0, 0.0, 0.0, 0.0, 0.0], Arc::clone(&store), GrowthConfig::enabled());
        let report = engine.apply_growth_boost(&id).await.report().cloned().unwrap();

        assert_eq!(report.like, InjectionOutcome::Inserted(bot.id));
        assert_eq!(report.comment, InjectionOutcome::Inserted(bot.id));
        assert_eq!(store.comments_for(&id)[0].content, crate::bots::BOT_COMMENTS[0]);
    }

    #[tokio::test]
    async fn test_empty_pool_skips_bot_steps() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::from_seed(9);
        let targets = GrowthTargets { views: 1000, likes: 50 };
        store.insert_video(Video::new(id, uploaded(now(), 6.0)).with_targets(targets).with_view_count(900));

        let engine = engine_with(&[0.0, 0.0], Arc::clone(&store), GrowthConfig::enabled());
        let report = engine.apply_growth_boost(&id).await.report().cloned().unwrap();

        assert_eq!(report.like, InjectionOutcome::NoBots);
        assert_eq!(report.comment, InjectionOutcome::NoBots);
    }

    #[tokio::test]
    async fn test_write_failures_are_swallowed() {
        let store = Arc::new(ProbeStore::new(true));
        let id = VideoId::from_seed(10);
        let targets = GrowthTargets { views: 1000, likes: 50 };
        store.inner.insert_video(Video::new(id, uploaded(now(), 6.0)).with_targets(targets));
        store.inner.register_bot("DiamondPick");

        let engine = engine_with(&[0.0; 8], Arc::clone(&store), GrowthConfig::enabled());
        let report = engine.apply_growth_boost(&id).await.report().cloned().unwrap();

        assert!(report.view_update_failed);
        assert_eq!(report.views_added, 0);
        assert_eq!(report.like, InjectionOutcome::Failed);
        assert_eq!(report.comment, InjectionOutcome::Failed);
        assert_eq!(store.inner.video(&id).unwrap().view_count, 0);
    }

    #[tokio::test]
    async fn test_failed_target_init_stops_the_pass() {
        let store = Arc::new(ProbeStore::new(true));
        let id = VideoId::from_seed(12);
        store.inner.insert_video(Video::new(id, uploaded(now(), 1.0)));

        let engine = engine_with(&[], Arc::clone(&store), GrowthConfig::enabled());
        assert_eq!(engine.apply_growth_boost(&id).await, BoostOutcome::TargetsUnavailable);
        // fetch + init attempt only
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_future_upload_counts_as_zero_hours() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(&[], store, GrowthConfig::enabled());
        assert_eq!(engine.hours_since(now() + HOUR), 0.0);
        assert!((engine.hours_since(uploaded(now(), 3.0)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GrowthConfig::enabled();
        config.min_likes = 500;
        let store = Arc::new(MemoryStore::new());
        let result = GrowthEngine::new(Arc::new(TokioContext::new()), Arc::clone(&store), store, config);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_spawn_boost_runs_in_background() {
        let store = Arc::new(MemoryStore::new());
        let id = VideoId::new();
        let created = SystemTime::now() - HOUR * 6;
        store.insert_video(Video::new(id, created));
        let mut feed = store.subscribe();

        let engine = Arc::new(
            GrowthEngine::new(Arc::new(TokioContext::new()), Arc::clone(&store), Arc::clone(&store), GrowthConfig::enabled())
                .unwrap(),
        );
        engine.spawn_boost(id);

        let event = tokio::time::timeout(Duration::from_secs(5), feed.recv())
            .await
            .expect("boost did not run")
            .unwrap();
        assert!(matches!(event, StoreEvent::VideoUpdated(video) if video.boosted));
    }
}
