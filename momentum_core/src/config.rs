//! Engine configuration.
//!
//! Every knob defaults to the production constants; the only value that is
//! normally read from the environment is the kill switch.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment variable gating the whole engine. Only `true` enables it.
pub const ENABLE_FLAG_VAR: &str = "ENABLE_COMMUNITY_SEEDING";

/// Environment variable selecting the comment cap scope (`all` | `bots`).
pub const CAP_SCOPE_VAR: &str = "COMMENT_CAP_SCOPE";

/// Largest target bound the engine accepts. Targets are drawn and scheduled
/// in `f64`, which represents every integer up to 2^53 exactly.
pub const MAX_TARGET: u64 = 1 << 53;

/// Which comments count toward the per-video synthetic comment cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommentCapScope {
    /// Every comment on the video, organic ones included.
    #[default]
    AllComments,
    /// Only comments authored by identities in the bot pool.
    BotsOnly,
}

impl std::str::FromStr for CommentCapScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "all_comments" => Ok(CommentCapScope::AllComments),
            "bots" | "bots_only" => Ok(CommentCapScope::BotsOnly),
            _ => Err(format!("Unknown comment cap scope: {}", s)),
        }
    }
}

/// Configuration for [`GrowthEngine`](crate::GrowthEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthConfig {
    /// Kill switch. When false the engine performs no reads or writes.
    pub enabled: bool,

    /// Hours after upload during which growth is applied (default: 12)
    pub window_hours: f64,

    /// Inclusive range for the randomized view target
    pub min_views: u64,
    pub max_views: u64,

    /// Inclusive range for the randomized like target
    pub min_likes: u64,
    pub max_likes: u64,

    /// Cap on comments per video, counted per `comment_cap_scope`
    pub max_comments: u64,

    /// Peak probability (at the curve's center) of a bot like per watch
    pub like_probability: f64,

    /// Peak probability of a bot comment per watch
    pub comment_probability: f64,

    /// Upper bound (exclusive) of the uniform noise added to each view chunk
    pub max_view_jitter: f64,

    pub comment_cap_scope: CommentCapScope,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_hours: 12.0,
            min_views: 200,
            max_views: 1200,
            min_likes: 25,
            max_likes: 100,
            max_comments: 6,
            like_probability: 0.3,
            comment_probability: 0.05,
            max_view_jitter: 5.0,
            comment_cap_scope: CommentCapScope::AllComments,
        }
    }
}

impl GrowthConfig {
    /// Default configuration with the kill switch turned on.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Reads the kill switch and cap scope from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENABLE_FLAG_VAR) {
            config.enabled = match raw.as_str() {
                "true" => true,
                "" | "false" => false,
                other => {
                    return Err(ConfigError::InvalidFlag {
                        var: ENABLE_FLAG_VAR,
                        value: other.to_string(),
                    })
                }
            };
        }

        if let Some(raw) = lookup(CAP_SCOPE_VAR) {
            config.comment_cap_scope = raw.trim().parse().map_err(|_| ConfigError::InvalidFlag {
                var: CAP_SCOPE_VAR,
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_cap_scope(mut self, scope: CommentCapScope) -> Self {
        self.comment_cap_scope = scope;
        self
    }

    pub fn with_like_probability(mut self, probability: f64) -> Self {
        self.like_probability = probability;
        self
    }

    pub fn with_comment_probability(mut self, probability: f64) -> Self {
        self.comment_probability = probability;
        self
    }

    pub fn with_max_comments(mut self, max_comments: u64) -> Self {
        self.max_comments = max_comments;
        self
    }

    /// Checks ranges and probabilities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.window_hours.is_finite() && self.window_hours > 0.0) {
            return Err(ConfigError::InvalidWindow(self.window_hours));
        }
        for (name, min, max) in [
            ("views", self.min_views, self.max_views),
            ("likes", self.min_likes, self.max_likes),
        ] {
            if min > max {
                return Err(ConfigError::InvalidRange { name, min, max });
            }
            if max > MAX_TARGET {
                return Err(ConfigError::TargetTooLarge {
                    name,
                    max,
                    limit: MAX_TARGET,
                });
            }
        }
        for (name, value) in [
            ("like_probability", self.like_probability),
            ("comment_probability", self.comment_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        if !(self.max_view_jitter.is_finite() && self.max_view_jitter >= 0.0) {
            return Err(ConfigError::InvalidJitter(self.max_view_jitter));
        }
        Ok(())
    }
}
