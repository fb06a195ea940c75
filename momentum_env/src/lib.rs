//! Momentum Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the growth engine
//! to run in both **Production** (tokio) and **Simulation** (virtual clock)
//! environments.
//!
//! # Core Concept
//!
//! For Deterministic Simulation Testing (DST), we intercept every source of
//! non-determinism the engine touches:
//! - Time (`system_time()`, `sleep()`)
//! - Randomness (`random_unit()`, `random_range()`, `random_index()`)
//! - Task spawning (`spawn()`)
//!
//! By deriving all entropy from a single 64-bit seed, any run becomes
//! reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use momentum_env::{MomentumContext, VideoId};
//!
//! fn hours_since<Ctx: MomentumContext>(ctx: &Ctx, uploaded: SystemTime) -> f64 {
//!     ctx.system_time()
//!         .duration_since(uploaded)
//!         .unwrap_or_default()
//!         .as_secs_f64() / 3600.0
//! }
//! ```

mod context;
mod types;
mod tokio_impl;

pub use context::MomentumContext;
pub use types::{UserId, VideoId};
pub use tokio_impl::TokioContext;
