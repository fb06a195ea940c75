//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::SimFrame;
use crate::faulty::FaultyStore;
use crate::oracle::{Oracle, Snapshot};

use momentum_core::curve;
use momentum_core::{BoostOutcome, Bot, GrowthConfig, GrowthEngine, MemoryStore, StoreError, Video, DEFAULT_BOT_NAMES};
use momentum_env::{MomentumContext, UserId, VideoId};
use std::sync::Arc;
use std::time::Duration;

/// The engine as wired in simulation: faults on the write path, bots read
/// straight from the backing store.
pub type SimEngine = GrowthEngine<SimContext, FaultyStore<MemoryStore>, MemoryStore>;

const SECS_PER_HOUR: f64 = 3600.0;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Size of the bot pool (names cycle through the default roster)
    pub num_bots: usize,

    /// Organic comments on the video before the first watch
    pub organic_comments: usize,

    /// Organic views on the video before the first watch
    pub initial_views: u64,

    /// Probability that a store write fails
    pub write_failure_rate: f64,

    pub growth: GrowthConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_bots: DEFAULT_BOT_NAMES.len(),
            organic_comments: 0,
            initial_views: 0,
            write_failure_rate: 0.0,
            growth: GrowthConfig::enabled(),
        }
    }
}

/// The SimWorld - one uploaded video, a bot pool, and the engine under test.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock + engine RNG)
    pub context: Arc<SimContext>,

    /// Backing store, read directly by the oracle
    pub store: Arc<MemoryStore>,

    /// Fault-injecting view of `store` handed to the engine
    pub faulty: Arc<FaultyStore<MemoryStore>>,

    pub engine: Arc<SimEngine>,

    /// Ground truth checker
    pub oracle: Oracle,

    video_id: VideoId,
    bots: Vec<Bot>,
    watches: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the video uploaded at virtual time zero.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        if !(0.0..=1.0).contains(&config.write_failure_rate) {
            return Err(SimError::InvalidFailureRate(config.write_failure_rate));
        }

        // Derive separate seeds for different subsystems
        let context_seed = config.seed;
        let fault_seed = config.seed.wrapping_mul(0x517cc1b727220a95);
        let roster_seed = config.seed.wrapping_mul(0xbf58476d1ce4e5b9);

        let context = SimContext::shared(context_seed);
        let store = Arc::new(MemoryStore::new());

        let video_id = VideoId::from_seed(config.seed);
        store.insert_video(Video::new(video_id, context.system_time()).with_view_count(config.initial_views));

        let bots: Vec<Bot> = (0..config.num_bots)
            .map(|i| Bot {
                id: UserId::from_seed(roster_seed.wrapping_add(i as u64)),
                username: DEFAULT_BOT_NAMES[i % DEFAULT_BOT_NAMES.len()].to_string(),
            })
            .collect();
        for bot in &bots {
            store.add_bot(bot.clone());
        }

        for i in 0..config.organic_comments {
            let viewer = UserId::from_seed(!roster_seed.wrapping_add(i as u64));
            store.add_comment(video_id, viewer, "first time seeing this channel", context.system_time());
        }

        let faulty = Arc::new(FaultyStore::new(Arc::clone(&store), fault_seed));
        faulty.set_write_failure_rate(config.write_failure_rate);

        let engine = Arc::new(GrowthEngine::new(
            Arc::clone(&context),
            Arc::clone(&faulty),
            Arc::clone(&store),
            config.growth.clone(),
        )?);

        let initial = snapshot_of(&context, &store, &video_id)?;
        let oracle = Oracle::new(&config.growth, bots.iter().map(|b| b.id), initial);

        Ok(Self {
            config,
            context,
            store,
            faulty,
            engine,
            oracle,
            video_id,
            bots,
            watches: 0,
        })
    }

    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    pub fn watches(&self) -> u64 {
        self.watches
    }

    /// Hours since the video was uploaded.
    pub fn hours_since_upload(&self) -> f64 {
        self.context.now().as_secs_f64() / SECS_PER_HOUR
    }

    /// Advances the virtual clock.
    pub fn advance(&self, duration: Duration) {
        self.context.advance_time(duration);
    }

    /// Advances the virtual clock to `hours` after upload (never backwards).
    pub fn advance_to_hour(&self, hours: f64) {
        let target = Duration::from_secs_f64(hours * SECS_PER_HOUR);
        let now = self.context.now();
        if target > now {
            self.context.advance_time(target - now);
        }
    }

    /// Current store state of the video.
    pub fn snapshot(&self) -> Result<Snapshot, SimError> {
        snapshot_of(&self.context, &self.store, &self.video_id)
    }

    /// One sequential watch: run the engine, then let the oracle check the result.
    pub async fn watch(&mut self) -> Result<BoostOutcome, SimError> {
        let outcome = self.engine.apply_growth_boost(&self.video_id).await;
        self.watches += 1;
        self.observe()?;
        Ok(outcome)
    }

    /// Runs `count` watches at the current instant, all in flight together.
    ///
    /// The oracle only sees the state once the whole burst has landed.
    pub async fn burst(&mut self, count: usize) -> Result<Vec<BoostOutcome>, SimError> {
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..count {
            let engine = Arc::clone(&self.engine);
            let video_id = self.video_id;
            tasks.spawn(async move { engine.apply_growth_boost(&video_id).await });
        }

        let mut outcomes = Vec::with_capacity(count);
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| StoreError::backend(format!("watch task failed: {}", e)))?;
            outcomes.push(outcome);
        }
        self.watches += count as u64;
        self.observe()?;
        Ok(outcomes)
    }

    /// Snapshot + oracle check without a watch.
    pub fn observe(&mut self) -> Result<(), SimError> {
        let snapshot = self.snapshot()?;
        self.oracle.observe(snapshot);
        Ok(())
    }

    /// Export frame for the current state.
    pub fn frame(&self) -> Result<SimFrame, SimError> {
        let snapshot = self.snapshot()?;
        let window = self.config.growth.window_hours;
        let hours = snapshot.hours_since_upload;
        let expected_views = snapshot
            .video
            .targets()
            .map(|t| curve::expected_views(t.views, curve::progress(hours, window)))
            .unwrap_or(0);

        Ok(SimFrame {
            time_hours: hours,
            view_count: snapshot.video.view_count,
            expected_views,
            displayed_views: snapshot.video.displayed_views(),
            likes: snapshot.likes.len() as u64,
            comments: snapshot.comments.len() as u64,
            curve_factor: curve::bell_curve_factor(hours, window),
            events: Vec::new(),
        })
    }
}

fn snapshot_of(context: &SimContext, store: &MemoryStore, video_id: &VideoId) -> Result<Snapshot, SimError> {
    let video = store.video(video_id).ok_or(StoreError::NotFound(*video_id))?;
    let time = context.now();
    Ok(Snapshot {
        time,
        hours_since_upload: time.as_secs_f64() / SECS_PER_HOUR,
        likes: store.likes_for(video_id),
        comments: store.comments_for(video_id),
        video,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use momentum_core::{GrowthStore, GrowthTargets};

    #[test]
    fn test_world_setup() {
        let world = SimWorld::new(SimConfig {
            seed: 7,
            num_bots: 25,
            organic_comments: 3,
            initial_views: 40,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(world.bots().len(), 25);
        // Names wrap around the roster
        assert_eq!(world.bots()[20].username, DEFAULT_BOT_NAMES[0]);

        let snap = world.snapshot().unwrap();
        assert_eq!(snap.video.view_count, 40);
        assert_eq!(snap.comments.len(), 3);
        // Organic comments live on the virtual clock
        assert!(snap.comments.iter().all(|c| c.created_at == world.context.system_time()));
        assert!(!snap.video.boosted);
        assert_eq!(snap.hours_since_upload, 0.0);
    }

    #[test]
    fn test_same_seed_same_roster() {
        let a = SimWorld::new(SimConfig { seed: 3, ..Default::default() }).unwrap();
        let b = SimWorld::new(SimConfig { seed: 3, ..Default::default() }).unwrap();
        assert_eq!(a.bots(), b.bots());
        assert_eq!(a.video_id(), b.video_id());
    }

    #[test]
    fn test_rejects_bad_failure_rate() {
        let result = SimWorld::new(SimConfig {
            write_failure_rate: 1.5,
            ..Default::default()
        });
        assert!(matches!(result, Err(SimError::InvalidFailureRate(_))));
    }

    #[tokio::test]
    async fn test_first_watch_sets_targets() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        world.advance_to_hour(1.0);

        let outcome = world.watch().await.unwrap();
        let report = outcome.report().expect("engine applied");
        assert!(report.initialized_targets);

        let video = world.snapshot().unwrap().video;
        assert_eq!(video.targets(), Some(report.targets));
        assert!(world.oracle.is_clean());
        assert_eq!(world.watches(), 1);
    }

    #[tokio::test]
    async fn test_frame_tracks_schedule() {
        let world = SimWorld::new(SimConfig::default()).unwrap();
        world
            .store
            .init_targets(&world.video_id(), GrowthTargets { views: 1200, likes: 30 })
            .await
            .unwrap();
        world.advance_to_hour(6.0);

        let frame = world.frame().unwrap();
        assert_eq!(frame.expected_views, 600);
        assert_eq!(frame.displayed_views, 1200);
        assert_eq!(frame.curve_factor, 1.0);
    }
}
