//! Momentum Core - synthetic engagement growth for fresh uploads
//!
//! A video gets a 12 hour growth window. Each watch during the window runs one
//! pass of the [`GrowthEngine`], which:
//! 1. **Targets**: lazily draws a view/like target once per video
//! 2. **Momentum**: catches the view counter up toward a linear schedule, in
//!    chunks sized by a bell curve peaking mid-window
//! 3. **Bots**: occasionally adds a like or a comment from a pre-seeded bot pool
//!
//! The engine is advisory. It never returns an error and is a no-op when the
//! kill switch is off.

pub mod bots;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod memory_store;
pub mod model;
pub mod sled_store;
pub mod store;

// Re-export key types for convenience
pub use bots::{InjectionOutcome, BOT_COMMENTS, DEFAULT_BOT_NAMES};
pub use config::{CommentCapScope, GrowthConfig, MAX_TARGET};
pub use engine::{BoostOutcome, BoostReport, GrowthEngine};
pub use error::{ConfigError, StoreError};
pub use memory_store::MemoryStore;
pub use model::{Bot, Comment, GrowthTargets, Like, Video};
pub use sled_store::SledStore;
pub use store::{BotDirectory, CommentFilter, CommentInsert, GrowthStore, StoreEvent};
