// In-memory store for videos, likes, comments and bots
//
// Backs tests and the simulator. All state lives behind one mutex, so every
// trait method is atomic with respect to the others.
//
// For persistent storage, see sled_store.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;
use momentum_env::{UserId, VideoId};
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::model::{Bot, Comment, GrowthTargets, Like, Video};
use crate::store::{BotDirectory, CommentFilter, CommentInsert, GrowthStore, StoreEvent};

/// Capacity of the change feed; slow subscribers observe `Lagged`.
const FEED_CAPACITY: usize = 1024;

#[derive(Default)]
struct MemoryState {
    videos: HashMap<VideoId, Video>,
    likes: BTreeMap<(VideoId, UserId), Like>,
    comments: Vec<Comment>,
    bots: Vec<Bot>,
}

/// Mutex-guarded in-memory implementation of [`GrowthStore`] and [`BotDirectory`].
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    feed: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            state: Mutex::new(MemoryState::default()),
            feed,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.feed.send(event);
    }

    /// Subscribes to the realtime change feed.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.feed.subscribe()
    }

    /// Inserts or replaces a video record (upload path, not the engine).
    pub fn insert_video(&self, video: Video) {
        self.state().videos.insert(video.id, video);
    }

    /// Adds a named bot to the pool and returns it.
    pub fn register_bot(&self, username: &str) -> Bot {
        let bot = Bot {
            id: UserId::new(),
            username: username.to_string(),
        };
        self.add_bot(bot.clone());
        bot
    }

    /// Adds a bot with a caller-chosen id (deterministic seeding).
    pub fn add_bot(&self, bot: Bot) {
        let mut state = self.state();
        if !state.bots.iter().any(|b| b.id == bot.id) {
            state.bots.push(bot);
        }
    }

    pub fn video(&self, id: &VideoId) -> Option<Video> {
        self.state().videos.get(id).cloned()
    }

    pub fn likes_for(&self, id: &VideoId) -> Vec<Like> {
        self.state()
            .likes
            .iter()
            .filter(|((video_id, _), _)| video_id == id)
            .map(|(_, like)| like.clone())
            .collect()
    }

    pub fn comments_for(&self, id: &VideoId) -> Vec<Comment> {
        self.state()
            .comments
            .iter()
            .filter(|c| c.video_id == *id)
            .cloned()
            .collect()
    }

    /// Organic comment from a real viewer.
    pub fn add_comment(&self, video_id: VideoId, user_id: UserId, content: &str, created_at: SystemTime) {
        let comment = Comment::new(video_id, user_id, content, created_at);
        self.state().comments.push(comment);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrowthStore for MemoryStore {
    async fn fetch_video(&self, id: &VideoId) -> Result<Option<Video>, StoreError> {
        Ok(self.state().videos.get(id).cloned())
    }

    async fn init_targets(&self, id: &VideoId, targets: GrowthTargets) -> Result<GrowthTargets, StoreError> {
        let (effective, updated) = {
            let mut state = self.state();
            let video = state.videos.get_mut(id).ok_or(StoreError::NotFound(*id))?;
            let was_boosted = video.boosted;
            let effective = video.init_targets(targets);
            (effective, (!was_boosted).then(|| video.clone()))
        };
        if let Some(video) = updated {
            self.publish(StoreEvent::VideoUpdated(video));
        }
        Ok(effective)
    }

    async fn increment_view_count(&self, id: &VideoId, amount: u64) -> Result<u64, StoreError> {
        let video = {
            let mut state = self.state();
            let video = state.videos.get_mut(id).ok_or(StoreError::NotFound(*id))?;
            video.view_count = video.view_count.saturating_add(amount);
            video.clone()
        };
        let count = video.view_count;
        self.publish(StoreEvent::VideoUpdated(video));
        Ok(count)
    }

    async fn insert_like(&self, like: Like) -> Result<bool, StoreError> {
        {
            let mut state = self.state();
            let key = (like.video_id, like.user_id);
            if state.likes.contains_key(&key) {
                return Ok(false);
            }
            state.likes.insert(key, like.clone());
        }
        self.publish(StoreEvent::LikeInserted(like));
        Ok(true)
    }

    async fn count_comments(&self, id: &VideoId, filter: CommentFilter<'_>) -> Result<u64, StoreError> {
        let count = self
            .state()
            .comments
            .iter()
            .filter(|c| c.video_id == *id && filter.matches(&c.user_id))
            .count();
        Ok(count as u64)
    }

    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError> {
        self.state().comments.push(comment.clone());
        self.publish(StoreEvent::CommentInserted(comment));
        Ok(())
    }

    async fn insert_comment_capped(
        &self,
        comment: Comment,
        max_comments: u64,
        counted: CommentFilter<'_>,
    ) -> Result<CommentInsert, StoreError> {
        {
            let mut state = self.state();
            let on_video = || state.comments.iter().filter(|c| c.video_id == comment.video_id);
            if on_video().any(|c| c.user_id == comment.user_id) {
                return Ok(CommentInsert::AuthorExists);
            }
            if on_video().filter(|c| counted.matches(&c.user_id)).count() as u64 >= max_comments {
                return Ok(CommentInsert::CapReached);
            }
            state.comments.push(comment.clone());
        }
        self.publish(StoreEvent::CommentInserted(comment));
        Ok(CommentInsert::Inserted)
    }
}

#[async_trait]
impl BotDirectory for MemoryStore {
    async fn list_bots(&self) -> Result<Vec<Bot>, StoreError> {
        Ok(self.state().bots.clone())
    }
}
