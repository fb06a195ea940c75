//! Data-access seams the engine runs against.
//!
//! The engine only needs a handful of primitives: point read by key, a
//! conditional target write, an atomic increment, insert-with-uniqueness for
//! likes, and comment counting. Anything richer belongs to the application.

use crate::error::StoreError;
use crate::model::{Bot, Comment, GrowthTargets, Like, Video};
use async_trait::async_trait;
use momentum_env::{UserId, VideoId};

/// Which comments to count on a video.
#[derive(Debug, Clone, Copy)]
pub enum CommentFilter<'a> {
    /// Every comment on the video
    All,
    /// Comments by one author
    ByAuthor(UserId),
    /// Comments by any of the listed authors
    ByAuthors(&'a [UserId]),
}

impl CommentFilter<'_> {
    pub fn matches(&self, author: &UserId) -> bool {
        match self {
            CommentFilter::All => true,
            CommentFilter::ByAuthor(id) => id == author,
            CommentFilter::ByAuthors(ids) => ids.contains(author),
        }
    }
}

/// Result of [`GrowthStore::insert_comment_capped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentInsert {
    Inserted,
    /// The author already commented on this video
    AuthorExists,
    /// The video already holds the maximum number of counted comments
    CapReached,
}

/// Video, like and comment persistence.
///
/// # Atomicity
///
/// Implementations must make `init_targets` a conditional write (only when
/// the video is not yet boosted) and `increment_view_count` a true atomic
/// increment. Concurrent watch events rely on both. Backends that can
/// should also override `insert_comment_capped` with an atomic version.
#[async_trait]
pub trait GrowthStore: Send + Sync + 'static {
    /// Point read. `Ok(None)` when the video does not exist.
    async fn fetch_video(&self, id: &VideoId) -> Result<Option<Video>, StoreError>;

    /// Sets targets and `boosted = true` unless already boosted.
    ///
    /// Returns the targets in effect after the write (first write wins).
    async fn init_targets(&self, id: &VideoId, targets: GrowthTargets) -> Result<GrowthTargets, StoreError>;

    /// Adds `amount` to the view counter, returning the new value.
    async fn increment_view_count(&self, id: &VideoId, amount: u64) -> Result<u64, StoreError>;

    /// Inserts a like. `Ok(false)` if the (video, user) pair already exists.
    async fn insert_like(&self, like: Like) -> Result<bool, StoreError>;

    async fn count_comments(&self, id: &VideoId, filter: CommentFilter<'_>) -> Result<u64, StoreError>;

    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError>;

    /// Inserts `comment` unless its author already commented on the video or
    /// `max_comments` comments matching `counted` already exist.
    ///
    /// The default is check-then-insert and can overshoot under concurrency.
    async fn insert_comment_capped(
        &self,
        comment: Comment,
        max_comments: u64,
        counted: CommentFilter<'_>,
    ) -> Result<CommentInsert, StoreError> {
        let video_id = comment.video_id;
        if self.count_comments(&video_id, CommentFilter::ByAuthor(comment.user_id)).await? > 0 {
            return Ok(CommentInsert::AuthorExists);
        }
        if self.count_comments(&video_id, counted).await? >= max_comments {
            return Ok(CommentInsert::CapReached);
        }
        self.insert_comment(comment).await?;
        Ok(CommentInsert::Inserted)
    }
}

/// Read-only view of the bot identity pool.
///
/// The pool is seeded out-of-band; the engine never writes to it.
#[async_trait]
pub trait BotDirectory: Send + Sync + 'static {
    async fn list_bots(&self) -> Result<Vec<Bot>, StoreError>;
}

/// Change notification emitted after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    VideoUpdated(Video),
    LikeInserted(Like),
    CommentInserted(Comment),
}
