//! Persistent store on an embedded sled database.
//!
//! Layout (one tree per record type, JSON values):
//!
//! | tree       | key                        | value     |
//! |------------|----------------------------|-----------|
//! | `videos`   | video id (16 bytes)        | `Video`   |
//! | `likes`    | video id ‖ user id         | `Like`    |
//! | `comments` | video id ‖ comment id      | `Comment` |
//! | `bots`     | user id                    | `Bot`     |
//!
//! Targets and view counts are updated with `update_and_fetch`, which sled
//! retries as a compare-and-swap loop, so neither races with concurrent
//! writers. Like uniqueness is a compare-and-swap against an absent key.
//! Capped comment inserts are serialized by a process-local lock because a
//! prefix scan cannot take part in a sled transaction.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use momentum_env::{UserId, VideoId};

use crate::error::StoreError;
use crate::model::{Bot, Comment, GrowthTargets, Like, Video};
use crate::store::{BotDirectory, CommentFilter, CommentInsert, GrowthStore};

pub struct SledStore {
    db: sled::Db,
    videos: sled::Tree,
    likes: sled::Tree,
    comments: sled::Tree,
    bots: sled::Tree,
    comment_lock: Mutex<()>,
}

fn pair_key(a: &[u8; 16], b: &[u8; 16]) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(a);
    key[16..].copy_from_slice(b);
    key
}

impl SledStore {
    /// Open a persistent store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::backend(format!("Failed to open sled DB: {}", e)))?;
        Self::from_db(db)
    }

    /// Create a temporary store, removed on drop
    pub fn open_temp() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::backend(format!("Failed to open temp DB: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            videos: db.open_tree("videos")?,
            likes: db.open_tree("likes")?,
            comments: db.open_tree("comments")?,
            bots: db.open_tree("bots")?,
            comment_lock: Mutex::new(()),
            db,
        })
    }

    /// Inserts or replaces a video record.
    pub fn insert_video(&self, video: &Video) -> Result<(), StoreError> {
        self.videos.insert(video.id.as_bytes(), serde_json::to_vec(video)?)?;
        self.db.flush()?;
        Ok(())
    }

    /// Adds a named bot to the pool.
    pub fn register_bot(&self, username: &str) -> Result<Bot, StoreError> {
        let bot = Bot {
            id: UserId::new(),
            username: username.to_string(),
        };
        self.bots.insert(bot.id.as_bytes(), serde_json::to_vec(&bot)?)?;
        self.db.flush()?;
        Ok(bot)
    }

    fn comments_on(&self, id: &VideoId) -> Result<Vec<Comment>, StoreError> {
        let mut comments = Vec::new();
        for entry in self.comments.scan_prefix(id.as_bytes()) {
            let (_, bytes) = entry?;
            comments.push(serde_json::from_slice(&bytes)?);
        }
        Ok(comments)
    }

    fn put_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let key = pair_key(comment.video_id.as_bytes(), comment.id.as_bytes());
        self.comments.insert(key, serde_json::to_vec(comment)?)?;
        self.db.flush()?;
        Ok(())
    }

    /// Applies `mutate` to the stored video atomically and returns the result.
    fn update_video<F>(&self, id: &VideoId, mut mutate: F) -> Result<Video, StoreError>
    where
        F: FnMut(&mut Video),
    {
        let mut decode_error = None;
        let updated = self.videos.update_and_fetch(id.as_bytes(), |current| {
            let bytes = current?;
            let encoded = serde_json::from_slice::<Video>(bytes).and_then(|mut video| {
                mutate(&mut video);
                serde_json::to_vec(&video)
            });
            match encoded {
                Ok(encoded) => Some(encoded),
                Err(err) => {
                    // Leave the record untouched
                    decode_error = Some(err);
                    Some(bytes.to_vec())
                }
            }
        })?;

        if let Some(err) = decode_error {
            return Err(err.into());
        }
        let bytes = updated.ok_or(StoreError::NotFound(*id))?;
        self.db.flush()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl GrowthStore for SledStore {
    async fn fetch_video(&self, id: &VideoId) -> Result<Option<Video>, StoreError> {
        match self.videos.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn init_targets(&self, id: &VideoId, targets: GrowthTargets) -> Result<GrowthTargets, StoreError> {
        let video = self.update_video(id, |video| {
            video.init_targets(targets);
        })?;
        video
            .targets()
            .ok_or_else(|| StoreError::backend("targets missing after initialization"))
    }

    async fn increment_view_count(&self, id: &VideoId, amount: u64) -> Result<u64, StoreError> {
        let video = self.update_video(id, |video| {
            video.view_count = video.view_count.saturating_add(amount);
        })?;
        Ok(video.view_count)
    }

    async fn insert_like(&self, like: Like) -> Result<bool, StoreError> {
        let key = pair_key(like.video_id.as_bytes(), like.user_id.as_bytes());
        let value = serde_json::to_vec(&like)?;
        let swapped = self.likes.compare_and_swap(key, None as Option<&[u8]>, Some(value))?;
        if swapped.is_ok() {
            self.db.flush()?;
        }
        Ok(swapped.is_ok())
    }

    async fn count_comments(&self, id: &VideoId, filter: CommentFilter<'_>) -> Result<u64, StoreError> {
        let comments = self.comments_on(id)?;
        Ok(comments.iter().filter(|c| filter.matches(&c.user_id)).count() as u64)
    }

    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError> {
        self.put_comment(&comment)
    }

    async fn insert_comment_capped(
        &self,
        comment: Comment,
        max_comments: u64,
        counted: CommentFilter<'_>,
    ) -> Result<CommentInsert, StoreError> {
        let _guard = self.comment_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let existing = self.comments_on(&comment.video_id)?;
        if existing.iter().any(|c| c.user_id == comment.user_id) {
            return Ok(CommentInsert::AuthorExists);
        }
        if existing.iter().filter(|c| counted.matches(&c.user_id)).count() as u64 >= max_comments {
            return Ok(CommentInsert::CapReached);
        }
        self.put_comment(&comment)?;
        Ok(CommentInsert::Inserted)
    }
}

#[async_trait]
impl BotDirectory for SledStore {
    async fn list_bots(&self) -> Result<Vec<Bot>, StoreError> {
        let mut bots = Vec::new();
        for entry in self.bots.iter() {
            let (_, bytes) = entry?;
            bots.push(serde_json::from_slice(&bytes)?);
        }
        Ok(bots)
    }
}
