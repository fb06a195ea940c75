//! Ground truth oracle for simulation.
//!
//! The Oracle watches the store from the outside. After every watch it takes
//! a [`Snapshot`] of the video and checks it against the previous one and the
//! growth configuration. Any broken invariant is recorded as a [`Violation`];
//! the run keeps going so one seed can surface several problems.

use std::collections::HashSet;
use std::time::Duration;

use momentum_core::curve;
use momentum_core::{Comment, CommentCapScope, GrowthConfig, GrowthTargets, Like, Video};
use momentum_env::UserId;
use thiserror::Error;

/// Store state for one video at one instant.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Virtual time since simulation start
    pub time: Duration,

    /// Hours since the video was uploaded
    pub hours_since_upload: f64,

    pub video: Video,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
}

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("targets changed from {before:?} to {after:?}")]
    TargetsChanged { before: GrowthTargets, after: GrowthTargets },

    #[error("view count went backwards: {before} -> {after}")]
    ViewsDecreased { before: u64, after: u64 },

    #[error("view count {views} exceeds target {target} by more than one chunk ({max_chunk})")]
    Overshoot { views: u64, target: u64, max_chunk: u64 },

    #[error("{0} likes share a (video, user) pair")]
    DuplicateLikes(usize),

    #[error("{counted} counted comments exceed the cap of {cap}")]
    CommentCapExceeded { counted: u64, cap: u64 },

    #[error("bot {0} commented more than once")]
    DuplicateBotComment(UserId),

    #[error("video changed {hours:.2}h after upload, past the window")]
    MutatedAfterWindow { hours: f64 },
}

/// Invariant checker for a single simulated video.
pub struct Oracle {
    window_hours: f64,
    max_comments: u64,
    cap_scope: CommentCapScope,
    max_view_jitter: f64,
    bot_ids: HashSet<UserId>,

    /// Views and countable organic comments present before any watch
    baseline_views: u64,
    baseline_counted: u64,

    /// Overshoot is only bounded when watches do not overlap
    check_overshoot: bool,

    last: Option<Snapshot>,
    violations: Vec<Violation>,
    observations: u64,
}

impl Oracle {
    /// Creates an oracle from the engine config, the bot pool and the
    /// state of the video before the first watch.
    pub fn new(config: &GrowthConfig, bot_ids: impl IntoIterator<Item = UserId>, initial: Snapshot) -> Self {
        let bot_ids: HashSet<UserId> = bot_ids.into_iter().collect();
        let baseline_counted = match config.comment_cap_scope {
            CommentCapScope::AllComments => initial.comments.len() as u64,
            CommentCapScope::BotsOnly => 0,
        };
        Self {
            window_hours: config.window_hours,
            max_comments: config.max_comments,
            cap_scope: config.comment_cap_scope,
            max_view_jitter: config.max_view_jitter,
            bot_ids,
            baseline_views: initial.video.view_count,
            baseline_counted,
            check_overshoot: true,
            last: Some(initial),
            violations: Vec::new(),
            observations: 0,
        }
    }

    /// Enables or disables the overshoot bound (off for concurrent bursts).
    pub fn set_check_overshoot(&mut self, enabled: bool) {
        self.check_overshoot = enabled;
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    /// Checks `snapshot` and makes it the new reference point.
    pub fn observe(&mut self, snapshot: Snapshot) {
        self.observations += 1;
        let mut found = Vec::new();

        if let Some(prev) = &self.last {
            if let (Some(before), Some(after)) = (prev.video.targets(), snapshot.video.targets()) {
                if before != after {
                    found.push(Violation::TargetsChanged { before, after });
                }
            }
            if snapshot.video.view_count < prev.video.view_count {
                found.push(Violation::ViewsDecreased {
                    before: prev.video.view_count,
                    after: snapshot.video.view_count,
                });
            }
            if snapshot.hours_since_upload > self.window_hours && changed(prev, &snapshot) {
                found.push(Violation::MutatedAfterWindow {
                    hours: snapshot.hours_since_upload,
                });
            }
        }

        if self.check_overshoot {
            if let Some(targets) = snapshot.video.targets() {
                let max_chunk = curve::catch_up_amount(targets.views, self.window_hours, 1.0, self.max_view_jitter);
                let views = snapshot.video.view_count;
                if views > self.baseline_views.max(targets.views + max_chunk) {
                    found.push(Violation::Overshoot {
                        views,
                        target: targets.views,
                        max_chunk,
                    });
                }
            }
        }

        let liked_by: HashSet<UserId> = snapshot.likes.iter().map(|l| l.user_id).collect();
        if liked_by.len() != snapshot.likes.len() {
            found.push(Violation::DuplicateLikes(snapshot.likes.len() - liked_by.len()));
        }

        let mut bot_authors = HashSet::new();
        let mut bot_comments = 0u64;
        for comment in &snapshot.comments {
            if self.bot_ids.contains(&comment.user_id) {
                bot_comments += 1;
                if !bot_authors.insert(comment.user_id) {
                    found.push(Violation::DuplicateBotComment(comment.user_id));
                }
            }
        }

        // Bots may only fill whatever room the organic baseline left
        let counted = match self.cap_scope {
            CommentCapScope::AllComments => self.baseline_counted + bot_comments,
            CommentCapScope::BotsOnly => bot_comments,
        };
        let cap = self.max_comments.max(self.baseline_counted);
        if counted > cap {
            found.push(Violation::CommentCapExceeded { counted, cap });
        }

        self.violations.extend(found);
        self.last = Some(snapshot);
    }
}

fn changed(before: &Snapshot, after: &Snapshot) -> bool {
    before.video.view_count != after.video.view_count
        || before.video.targets() != after.video.targets()
        || before.likes.len() != after.likes.len()
        || before.comments.len() != after.comments.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use momentum_env::VideoId;
    use std::time::SystemTime;

    fn snapshot(hours: f64, video: Video) -> Snapshot {
        Snapshot {
            time: Duration::from_secs_f64(hours * 3600.0),
            hours_since_upload: hours,
            video,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn fresh() -> Video {
        Video::new(VideoId::from_seed(1), SystemTime::UNIX_EPOCH)
    }

    fn targets(views: u64) -> GrowthTargets {
        GrowthTargets { views, likes: 50 }
    }

    #[test]
    fn test_clean_progression() {
        let mut oracle = Oracle::new(&GrowthConfig::enabled(), [], snapshot(0.0, fresh()));

        oracle.observe(snapshot(1.0, fresh().with_targets(targets(600)).with_view_count(10)));
        oracle.observe(snapshot(2.0, fresh().with_targets(targets(600)).with_view_count(90)));

        assert!(oracle.is_clean(), "{:?}", oracle.violations());
        assert_eq!(oracle.observations(), 2);
    }

    #[test]
    fn test_detects_target_change_and_view_regression() {
        let mut oracle = Oracle::new(&GrowthConfig::enabled(), [], snapshot(0.0, fresh()));

        oracle.observe(snapshot(1.0, fresh().with_targets(targets(600)).with_view_count(50)));
        oracle.observe(snapshot(2.0, fresh().with_targets(targets(700)).with_view_count(40)));

        assert_eq!(oracle.violations().len(), 2);
        assert!(matches!(oracle.violations()[0], Violation::TargetsChanged { .. }));
        assert!(matches!(oracle.violations()[1], Violation::ViewsDecreased { before: 50, after: 40 }));
    }

    #[test]
    fn test_overshoot_bound() {
        let mut oracle = Oracle::new(&GrowthConfig::enabled(), [], snapshot(0.0, fresh()));

        // 600 / 12 + 5 = 55 per chunk at most
        oracle.observe(snapshot(11.0, fresh().with_targets(targets(600)).with_view_count(655)));
        assert!(oracle.is_clean());

        oracle.observe(snapshot(11.5, fresh().with_targets(targets(600)).with_view_count(656)));
        assert!(matches!(oracle.violations()[0], Violation::Overshoot { max_chunk: 55, .. }));
    }

    #[test]
    fn test_overshoot_ignores_organic_baseline() {
        let busy = fresh().with_view_count(5000);
        let mut oracle = Oracle::new(&GrowthConfig::enabled(), [], snapshot(0.0, busy.clone()));

        oracle.observe(snapshot(1.0, busy.with_targets(targets(300))));
        assert!(oracle.is_clean());
    }

    #[test]
    fn test_mutation_after_window() {
        let mut oracle = Oracle::new(&GrowthConfig::enabled(), [], snapshot(0.0, fresh()));
        oracle.observe(snapshot(11.9, fresh().with_targets(targets(600)).with_view_count(590)));
        oracle.observe(snapshot(12.5, fresh().with_targets(targets(600)).with_view_count(590)));
        assert!(oracle.is_clean());

        oracle.observe(snapshot(13.0, fresh().with_targets(targets(600)).with_view_count(600)));
        assert!(matches!(oracle.violations()[0], Violation::MutatedAfterWindow { .. }));
    }

    #[test]
    fn test_comment_rules() {
        let bot = UserId::from_seed(1);
        let mut oracle = Oracle::new(&GrowthConfig::enabled().with_max_comments(2), [bot], snapshot(0.0, fresh()));

        let video = fresh();
        let mut snap = snapshot(3.0, video.clone());
        snap.comments = vec![
            Comment::new(video.id, bot, "Valid.", SystemTime::UNIX_EPOCH),
            Comment::new(video.id, bot, "W video", SystemTime::UNIX_EPOCH),
            Comment::new(video.id, bot, "Legendary.", SystemTime::UNIX_EPOCH),
        ];
        oracle.observe(snap);

        let violations = oracle.violations();
        assert_eq!(violations.iter().filter(|v| matches!(v, Violation::DuplicateBotComment(_))).count(), 2);
        assert!(violations.contains(&Violation::CommentCapExceeded { counted: 3, cap: 2 }));
    }

    #[test]
    fn test_duplicate_likes() {
        let mut oracle = Oracle::new(&GrowthConfig::enabled(), [], snapshot(0.0, fresh()));
        let video = fresh();
        let like = Like {
            video_id: video.id,
            user_id: UserId::from_seed(3),
            created_at: SystemTime::UNIX_EPOCH,
        };
        let mut snap = snapshot(1.0, video);
        snap.likes = vec![like.clone(), like];
        oracle.observe(snap);

        assert_eq!(oracle.violations(), &[Violation::DuplicateLikes(1)]);
    }
}
