//! Records the engine reads and writes.

use momentum_env::{UserId, VideoId};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Growth targets drawn once per video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrowthTargets {
    pub views: u64,
    pub likes: u64,
}

/// The engagement-relevant slice of a video record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,

    /// Upload time; the growth window is measured from here
    pub created_at: SystemTime,

    /// Externally visible view counter. Only ever incremented.
    pub view_count: u64,

    /// True once targets have been initialized
    pub boosted: bool,

    pub target_views: u64,
    pub target_likes: u64,
}

impl Video {
    /// A freshly uploaded, not yet boosted video.
    pub fn new(id: VideoId, created_at: SystemTime) -> Self {
        Self {
            id,
            created_at,
            view_count: 0,
            boosted: false,
            target_views: 0,
            target_likes: 0,
        }
    }

    pub fn with_view_count(mut self, view_count: u64) -> Self {
        self.view_count = view_count;
        self
    }

    /// A video whose targets were already drawn.
    pub fn with_targets(mut self, targets: GrowthTargets) -> Self {
        self.boosted = true;
        self.target_views = targets.views;
        self.target_likes = targets.likes;
        self
    }

    /// Targets, if initialized.
    pub fn targets(&self) -> Option<GrowthTargets> {
        self.boosted.then_some(GrowthTargets {
            views: self.target_views,
            likes: self.target_likes,
        })
    }

    /// Sets targets unless already boosted. Returns the targets in effect.
    ///
    /// Store backends run this inside their atomic update.
    pub fn init_targets(&mut self, targets: GrowthTargets) -> GrowthTargets {
        if !self.boosted {
            self.boosted = true;
            self.target_views = targets.views;
            self.target_likes = targets.likes;
        }
        GrowthTargets {
            views: self.target_views,
            likes: self.target_likes,
        }
    }

    /// View count shown on feed cards: never below the growth target.
    pub fn displayed_views(&self) -> u64 {
        self.view_count.max(self.target_views)
    }
}

/// A bot identity from the pre-seeded pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub video_id: VideoId,
    pub user_id: UserId,
    pub created_at: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub video_id: VideoId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: SystemTime,
}

impl Comment {
    pub fn new(video_id: VideoId, user_id: UserId, content: impl Into<String>, created_at: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id,
            user_id,
            content: content.into(),
            created_at,
        }
    }
}
