//! Scenario runner - drives the growth engine through traffic scenarios.

use crate::audience::Audience;
use crate::error::SimError;
use crate::exporter::{SimEvent, SimExport};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use momentum_core::{BoostOutcome, CommentCapScope, GrowthConfig, GrowthTargets, InjectionOutcome};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Hours between exported frames.
const FRAME_INTERVAL_HOURS: f64 = 0.25;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Final simulation time in hours since upload
    pub final_time_hours: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    pub watches: u64,

    /// Watches that ran a full growth pass
    pub applied: u64,
    pub disabled: u64,
    pub window_closed: u64,
    pub video_unavailable: u64,
    pub targets_unavailable: u64,

    /// Sum of reported view increments
    pub views_added: u64,
    pub view_update_failures: u64,

    pub likes_inserted: u64,
    pub duplicate_likes: u64,
    pub comments_inserted: u64,
    pub already_commented: u64,
    pub cap_reached: u64,
    pub no_bots: u64,
    pub injection_failures: u64,

    pub final_views: u64,
    pub target_views: Option<u64>,
    pub likes: u64,
    pub comments: u64,

    pub store_reads: u64,
    pub store_writes: u64,
    pub injected_failures: u64,

    /// Oracle violations
    pub violations: u64,
}

impl ScenarioMetrics {
    fn record(&mut self, outcome: &BoostOutcome) {
        self.watches += 1;
        match outcome {
            BoostOutcome::Disabled => self.disabled += 1,
            BoostOutcome::VideoUnavailable => self.video_unavailable += 1,
            BoostOutcome::WindowClosed { .. } => self.window_closed += 1,
            BoostOutcome::TargetsUnavailable => self.targets_unavailable += 1,
            BoostOutcome::Applied(report) => {
                self.applied += 1;
                self.views_added += report.views_added;
                if report.view_update_failed {
                    self.view_update_failures += 1;
                }
                if report.like.inserted() {
                    self.likes_inserted += 1;
                }
                if report.comment.inserted() {
                    self.comments_inserted += 1;
                }
                self.record_injection(report.like);
                self.record_injection(report.comment);
            }
        }
    }

    fn record_injection(&mut self, outcome: InjectionOutcome) {
        match outcome {
            InjectionOutcome::NotRolled | InjectionOutcome::Inserted(_) => {}
            InjectionOutcome::NoBots => self.no_bots += 1,
            InjectionOutcome::DuplicateLike(_) => self.duplicate_likes += 1,
            InjectionOutcome::AlreadyCommented(_) => self.already_commented += 1,
            InjectionOutcome::CapReached => self.cap_reached += 1,
            InjectionOutcome::Failed => self.injection_failures += 1,
        }
    }

    fn record_all(&mut self, outcomes: &[BoostOutcome]) {
        for outcome in outcomes {
            self.record(outcome);
        }
    }
}

/// Runs growth scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Mean watch arrival rate
    watches_per_hour: f64,

    /// Simulated hours after upload
    duration_hours: f64,

    /// Which comments count toward the cap
    cap_scope: CommentCapScope,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            watches_per_hour: 30.0,
            duration_hours: 14.0,
            cap_scope: CommentCapScope::default(),
        }
    }

    /// Sets the mean watch arrival rate.
    pub fn with_rate(mut self, watches_per_hour: f64) -> Self {
        self.watches_per_hour = watches_per_hour;
        self
    }

    /// Sets the simulated duration.
    pub fn with_duration(mut self, hours: f64) -> Self {
        self.duration_hours = hours;
        self
    }

    /// Sets which comments count toward the cap in every scenario.
    pub fn with_cap_scope(mut self, scope: CommentCapScope) -> Self {
        self.cap_scope = scope;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_recorded(scenario).0
    }

    /// Runs a scenario and also returns its sampled frames.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let mut export = SimExport::new(scenario.name(), self.seed);
        let result = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.execute(scenario, &mut export)),
            Err(e) => Err(SimError::from(e)),
        };

        let result = result.unwrap_or_else(|e| {
            warn!("Scenario {} aborted: {}", scenario.name(), e);
            ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                final_time_hours: 0.0,
                failure_reason: Some(e.to_string()),
                metrics: ScenarioMetrics::default(),
            }
        });

        export.finalize(result.passed, result.metrics.target_views, Some(result.metrics.final_views));
        (result, export)
    }

    async fn execute(&self, scenario: ScenarioId, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        match scenario {
            ScenarioId::SteadyTraffic => self.run_steady_traffic(export).await,
            ScenarioId::FlashCrowd => self.run_flash_crowd(export).await,
            ScenarioId::FirstWatchRace => self.run_first_watch_race(export).await,
            ScenarioId::LateArrival => self.run_late_arrival(export).await,
            ScenarioId::KillSwitch => self.run_kill_switch(export).await,
            ScenarioId::EmptyPool => self.run_empty_pool(export).await,
            ScenarioId::OrganicCrowd => self.run_organic_crowd(export).await,
            ScenarioId::FlakyBackend => self.run_flaky_backend(export).await,
            ScenarioId::CommentSaturation => self.run_comment_saturation(export).await,
        }
    }

    fn world(&self, config: SimConfig) -> Result<SimWorld, SimError> {
        SimWorld::new(SimConfig {
            seed: self.seed,
            growth: config.growth.with_cap_scope(self.cap_scope),
            ..config
        })
    }

    /// Plays Poisson watch traffic from the current time until `until_hours`.
    async fn drive(
        &self,
        world: &mut SimWorld,
        metrics: &mut ScenarioMetrics,
        export: &mut SimExport,
        until_hours: f64,
    ) -> Result<(), SimError> {
        let audience_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let mut audience = Audience::new(audience_seed, self.watches_per_hour)?;

        let start = world.hours_since_upload();
        let window = world.config.growth.window_hours;
        let mut next_frame = start;
        let mut window_logged = start > window;

        loop {
            let gap_hours = audience.next_gap().as_secs_f64() / 3600.0;
            let at = world.hours_since_upload() + gap_hours;
            if at > until_hours {
                break;
            }
            world.advance_to_hour(at);
            let outcome = world.watch().await?;
            metrics.record(&outcome);

            if at >= next_frame {
                let mut frame = world.frame()?;
                if !window_logged && at > window {
                    window_logged = true;
                    frame.events.push(SimEvent {
                        message: "growth window closed".to_string(),
                        level: Some("info".to_string()),
                    });
                }
                debug!(
                    "  t={:.2}h | views={} (expected {}) | likes={} | comments={}",
                    frame.time_hours, frame.view_count, frame.expected_views, frame.likes, frame.comments
                );
                export.add_frame(frame);
                while next_frame <= at {
                    next_frame += FRAME_INTERVAL_HOURS;
                }
            }
        }
        Ok(())
    }

    /// Collects final metrics and folds oracle violations and scenario checks into a result.
    fn finish(
        &self,
        scenario: ScenarioId,
        world: &SimWorld,
        mut metrics: ScenarioMetrics,
        mut failures: Vec<String>,
    ) -> Result<ScenarioResult, SimError> {
        let snapshot = world.snapshot()?;
        let stats = world.faulty.stats();

        metrics.final_views = snapshot.video.view_count;
        metrics.target_views = snapshot.video.targets().map(|t| t.views);
        metrics.likes = snapshot.likes.len() as u64;
        metrics.comments = snapshot.comments.len() as u64;
        metrics.store_reads = stats.reads;
        metrics.store_writes = stats.writes;
        metrics.injected_failures = stats.injected_failures;
        metrics.violations = world.oracle.violations().len() as u64;

        for violation in world.oracle.violations() {
            warn!("Oracle violation in {}: {}", scenario.name(), violation);
        }
        let mut reasons: Vec<String> = world.oracle.violations().iter().map(|v| v.to_string()).collect();
        reasons.append(&mut failures);

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed: reasons.is_empty(),
            final_time_hours: snapshot.hours_since_upload,
            failure_reason: (!reasons.is_empty()).then(|| reasons.join("; ")),
            metrics,
        })
    }

    /// DST-001: SteadyTraffic - the baseline.
    ///
    /// **Assertion**: targets drawn once, views end within 10% of the target
    /// when traffic is dense enough to keep up, no oracle violations.
    async fn run_steady_traffic(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        let mut world = self.world(SimConfig::default())?;
        let mut metrics = ScenarioMetrics::default();
        self.drive(&mut world, &mut metrics, export, self.duration_hours).await?;

        let mut failures = Vec::new();
        let video = world.snapshot()?.video;
        match video.targets() {
            None => failures.push("targets never initialized".to_string()),
            Some(targets) => {
                let window = world.config.growth.window_hours;
                if self.watches_per_hour >= 10.0 && self.duration_hours >= window {
                    let floor = targets.views * 9 / 10;
                    if video.view_count < floor {
                        failures.push(format!(
                            "views {} fell behind the schedule (target {})",
                            video.view_count, targets.views
                        ));
                    }
                }
            }
        }
        if metrics.views_added != video.view_count {
            failures.push(format!(
                "reported increments {} != stored views {}",
                metrics.views_added, video.view_count
            ));
        }

        self.finish(ScenarioId::SteadyTraffic, &world, metrics, failures)
    }

    /// DST-002: FlashCrowd - atomic increments under contention.
    ///
    /// **Assertion**: stored views == views before the burst + every reported increment.
    async fn run_flash_crowd(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        const BURST: usize = 64;

        let mut world = self.world(SimConfig::default())?;
        world.oracle.set_check_overshoot(false);
        let mut metrics = ScenarioMetrics::default();

        world.advance_to_hour(0.5);
        let first = world.watch().await?;
        metrics.record(&first);

        world.advance_to_hour(world.config.growth.window_hours / 2.0);
        let before = world.snapshot()?.video.view_count;
        export.add_frame(world.frame()?);

        let outcomes = world.burst(BURST).await?;
        metrics.record_all(&outcomes);
        export.add_frame(world.frame()?);

        let mut failures = Vec::new();
        let added: u64 = outcomes.iter().filter_map(|o| o.report()).map(|r| r.views_added).sum();
        let after = world.snapshot()?.video.view_count;
        if after != before + added {
            failures.push(format!("lost updates: {} + {} reported != {} stored", before, added, after));
        }
        let applied = outcomes.iter().filter(|o| o.report().is_some()).count();
        if applied != BURST {
            failures.push(format!("only {}/{} watches applied", applied, BURST));
        }

        self.finish(ScenarioId::FlashCrowd, &world, metrics, failures)
    }

    /// DST-003: FirstWatchRace - conditional target initialization.
    ///
    /// **Assertion**: every concurrent first watch reports the stored targets.
    async fn run_first_watch_race(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        const BURST: usize = 32;

        let mut world = self.world(SimConfig::default())?;
        world.oracle.set_check_overshoot(false);
        let mut metrics = ScenarioMetrics::default();

        world.advance_to_hour(0.25);
        let outcomes = world.burst(BURST).await?;
        metrics.record_all(&outcomes);
        export.add_frame(world.frame()?);

        let mut failures = Vec::new();
        let reported: HashSet<GrowthTargets> = outcomes.iter().filter_map(|o| o.report()).map(|r| r.targets).collect();
        let stored = world.snapshot()?.video.targets();
        match stored {
            None => failures.push("no targets stored after the race".to_string()),
            Some(stored) => {
                if reported.len() != 1 || !reported.contains(&stored) {
                    failures.push(format!("{} distinct targets reported, stored {:?}", reported.len(), stored));
                }
            }
        }

        self.finish(ScenarioId::FirstWatchRace, &world, metrics, failures)
    }

    /// DST-004: LateArrival - the window is closed before anyone watches.
    ///
    /// **Assertion**: every watch reports WindowClosed and the record is untouched.
    async fn run_late_arrival(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        let mut world = self.world(SimConfig {
            initial_views: 17,
            ..Default::default()
        })?;
        let mut metrics = ScenarioMetrics::default();

        let start = world.config.growth.window_hours + 1.0;
        world.advance_to_hour(start);
        self.drive(&mut world, &mut metrics, export, start + 2.0).await?;

        let mut failures = Vec::new();
        if metrics.window_closed != metrics.watches {
            failures.push(format!("{}/{} watches saw a closed window", metrics.window_closed, metrics.watches));
        }
        let snapshot = world.snapshot()?;
        if snapshot.video.boosted || snapshot.video.view_count != 17 || !snapshot.likes.is_empty() || !snapshot.comments.is_empty() {
            failures.push("late video was modified".to_string());
        }

        self.finish(ScenarioId::LateArrival, &world, metrics, failures)
    }

    /// DST-005: KillSwitch - flag off.
    ///
    /// **Assertion**: the engine never touches the store.
    async fn run_kill_switch(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        let mut world = self.world(SimConfig {
            growth: GrowthConfig::default(),
            ..Default::default()
        })?;
        let mut metrics = ScenarioMetrics::default();
        self.drive(&mut world, &mut metrics, export, self.duration_hours).await?;

        let mut failures = Vec::new();
        if metrics.disabled != metrics.watches {
            failures.push(format!("{}/{} watches reported disabled", metrics.disabled, metrics.watches));
        }
        let stats = world.faulty.stats();
        if stats.reads + stats.writes > 0 {
            failures.push(format!("store touched: {} reads, {} writes", stats.reads, stats.writes));
        }

        self.finish(ScenarioId::KillSwitch, &world, metrics, failures)
    }

    /// DST-006: EmptyPool - views only.
    async fn run_empty_pool(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        let mut world = self.world(SimConfig {
            num_bots: 0,
            growth: GrowthConfig::enabled()
                .with_like_probability(1.0)
                .with_comment_probability(1.0),
            ..Default::default()
        })?;
        let mut metrics = ScenarioMetrics::default();
        self.drive(&mut world, &mut metrics, export, self.duration_hours).await?;

        let mut failures = Vec::new();
        let snapshot = world.snapshot()?;
        if !snapshot.likes.is_empty() || !snapshot.comments.is_empty() {
            failures.push("engagement appeared without bots".to_string());
        }
        if metrics.applied > 0 && snapshot.video.view_count == 0 {
            failures.push("views did not grow".to_string());
        }
        if metrics.applied > 0 && metrics.no_bots == 0 {
            failures.push("no injection reported an empty pool".to_string());
        }

        self.finish(ScenarioId::EmptyPool, &world, metrics, failures)
    }

    /// DST-007: OrganicCrowd - real viewers already filled the comment cap.
    async fn run_organic_crowd(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        const ORGANIC: usize = 8;

        let mut world = self.world(SimConfig {
            organic_comments: ORGANIC,
            growth: GrowthConfig::enabled().with_comment_probability(1.0),
            ..Default::default()
        })?;
        let mut metrics = ScenarioMetrics::default();
        self.drive(&mut world, &mut metrics, export, self.duration_hours).await?;

        let mut failures = Vec::new();
        let comments = world.snapshot()?.comments.len();
        let bot_comments = comments - ORGANIC;
        match self.cap_scope {
            CommentCapScope::AllComments => {
                if bot_comments > 0 {
                    failures.push(format!("bots commented past the cap: {} comments", comments));
                }
                if metrics.comments_attempted() > 0 && metrics.cap_reached == 0 {
                    failures.push("cap was never reported".to_string());
                }
            }
            CommentCapScope::BotsOnly => {
                let max_comments = world.config.growth.max_comments as usize;
                if metrics.comments_attempted() >= 2 * world.bots().len() && bot_comments != max_comments {
                    failures.push(format!("{} bot comments, expected {}", bot_comments, max_comments));
                }
            }
        }

        self.finish(ScenarioId::OrganicCrowd, &world, metrics, failures)
    }

    /// DST-008: FlakyBackend - 30% of writes fail.
    ///
    /// **Assertion**: the engine keeps going, eventually draws targets, and
    /// the oracle sees no inconsistent state.
    async fn run_flaky_backend(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        let mut world = self.world(SimConfig {
            write_failure_rate: 0.3,
            ..Default::default()
        })?;
        let mut metrics = ScenarioMetrics::default();
        self.drive(&mut world, &mut metrics, export, self.duration_hours).await?;

        let mut failures = Vec::new();
        let snapshot = world.snapshot()?;
        if metrics.applied > 0 && snapshot.video.targets().is_none() {
            failures.push("targets never initialized".to_string());
        }
        if snapshot.video.view_count != metrics.views_added {
            failures.push(format!(
                "failed increments were counted: {} reported, {} stored",
                metrics.views_added, snapshot.video.view_count
            ));
        }

        self.finish(ScenarioId::FlakyBackend, &world, metrics, failures)
    }

    /// DST-009: CommentSaturation - forced engagement.
    ///
    /// **Assertion**: exactly `max_comments` comments from distinct bots,
    /// at most one like per bot.
    async fn run_comment_saturation(&self, export: &mut SimExport) -> Result<ScenarioResult, SimError> {
        let mut world = self.world(SimConfig {
            growth: GrowthConfig::enabled()
                .with_like_probability(1.0)
                .with_comment_probability(1.0),
            ..Default::default()
        })?;
        let mut metrics = ScenarioMetrics::default();
        self.drive(&mut world, &mut metrics, export, self.duration_hours).await?;

        let mut failures = Vec::new();
        let snapshot = world.snapshot()?;
        let max_comments = world.config.growth.max_comments as usize;
        let bots = world.bots().len();
        if metrics.comments_attempted() >= 2 * bots && snapshot.comments.len() != max_comments {
            failures.push(format!("{} comments, expected the cap of {}", snapshot.comments.len(), max_comments));
        }
        if snapshot.likes.len() > bots {
            failures.push(format!("{} likes from {} bots", snapshot.likes.len(), bots));
        }

        self.finish(ScenarioId::CommentSaturation, &world, metrics, failures)
    }
}

impl ScenarioMetrics {
    /// Comment injections that got past the probability roll.
    fn comments_attempted(&self) -> usize {
        (self.comments_inserted + self.already_commented + self.cap_reached) as usize
    }
}
