//! Bot-driven likes and comments.
//!
//! Both injectors pick one bot uniformly from the pool and then defer to the
//! store for uniqueness. Neither ever writes to the pool itself.

use momentum_env::{MomentumContext, UserId, VideoId};
use tracing::debug;

use crate::config::{CommentCapScope, GrowthConfig};
use crate::error::StoreError;
use crate::model::{Bot, Comment, Like};
use crate::store::{BotDirectory, CommentFilter, CommentInsert, GrowthStore};

/// Generic affirming phrases bots comment with.
pub const BOT_COMMENTS: [&str; 17] = [
    "This is actually insane! 🔥",
    "First! 🥇",
    "Underrated content honestly.",
    "The editing on this is clean.",
    "What software do you use?",
    "Keep grinding! 🚀",
    "Subbed! Can you check my channel?",
    "That last part was crazy.",
    "Needs more views.",
    "Legendary.",
    "W video",
    "Sheesh 🥶",
    "Valid.",
    "Waiting for the next one!",
    "This deserves way more likes.",
    "Algorithm brought me here and I'm not mad.",
    "High quality stuff!",
];

/// Usernames for the one-time bot seeding job.
pub const DEFAULT_BOT_NAMES: [&str; 20] = [
    "ProGamerX", "SpeedRunna", "PixelQueen", "RetroDave", "SniperWolf_99",
    "GlitchHunter", "LootGoblin", "CampMaster", "NoScope360", "QuestGiver",
    "NPC_Energy", "BossBattle", "ManaPotion", "XP_Grinder", "LevelUp_Jim",
    "CraftingMama", "RedStoneEng", "DiamondPick", "CreeperHug", "Enderman_404",
];

/// What a like or comment attempt ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// The probability roll did not fire
    NotRolled,
    /// The pool is empty
    NoBots,
    Inserted(UserId),
    /// The bot already liked this video
    DuplicateLike(UserId),
    /// The bot already commented on this video
    AlreadyCommented(UserId),
    /// The video is at the comment cap
    CapReached,
    /// A store call failed; the attempt was abandoned
    Failed,
}

impl InjectionOutcome {
    pub fn inserted(&self) -> bool {
        matches!(self, InjectionOutcome::Inserted(_))
    }
}

async fn pick_bot<Ctx, B>(context: &Ctx, bots: &B) -> Result<Option<Bot>, StoreError>
where
    Ctx: MomentumContext,
    B: BotDirectory,
{
    let mut pool = bots.list_bots().await?;
    if pool.is_empty() {
        return Ok(None);
    }
    let index = context.random_index(pool.len());
    Ok(Some(pool.swap_remove(index)))
}

/// Adds one like from a random bot; duplicates are silent no-ops.
pub async fn inject_like<Ctx, S, B>(
    context: &Ctx,
    store: &S,
    bots: &B,
    video_id: &VideoId,
) -> Result<InjectionOutcome, StoreError>
where
    Ctx: MomentumContext,
    S: GrowthStore,
    B: BotDirectory,
{
    let Some(bot) = pick_bot(context, bots).await? else {
        return Ok(InjectionOutcome::NoBots);
    };

    let like = Like {
        video_id: *video_id,
        user_id: bot.id,
        created_at: context.system_time(),
    };

    if store.insert_like(like).await? {
        debug!("{} liked video {}", bot.username, video_id);
        Ok(InjectionOutcome::Inserted(bot.id))
    } else {
        Ok(InjectionOutcome::DuplicateLike(bot.id))
    }
}

/// Adds one comment from a random bot, honoring the per-bot and cap limits.
///
/// Both limits are enforced by the store in the same write as the insert.
pub async fn inject_comment<Ctx, S, B>(
    context: &Ctx,
    store: &S,
    bots: &B,
    config: &GrowthConfig,
    video_id: &VideoId,
) -> Result<InjectionOutcome, StoreError>
where
    Ctx: MomentumContext,
    S: GrowthStore,
    B: BotDirectory,
{
    let pool = bots.list_bots().await?;
    if pool.is_empty() {
        return Ok(InjectionOutcome::NoBots);
    }
    let bot = &pool[context.random_index(pool.len())];
    let text = BOT_COMMENTS[context.random_index(BOT_COMMENTS.len())];
    let comment = Comment::new(*video_id, bot.id, text, context.system_time());

    let bot_ids: Vec<UserId>;
    let counted = match config.comment_cap_scope {
        CommentCapScope::AllComments => CommentFilter::All,
        CommentCapScope::BotsOnly => {
            bot_ids = pool.iter().map(|b| b.id).collect();
            CommentFilter::ByAuthors(&bot_ids)
        }
    };

    match store.insert_comment_capped(comment, config.max_comments, counted).await? {
        CommentInsert::Inserted => {
            debug!("{} commented on video {}", bot.username, video_id);
            Ok(InjectionOutcome::Inserted(bot.id))
        }
        CommentInsert::AuthorExists => Ok(InjectionOutcome::AlreadyCommented(bot.id)),
        CommentInsert::CapReached => Ok(InjectionOutcome::CapReached),
    }
}
