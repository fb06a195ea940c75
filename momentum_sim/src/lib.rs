//! Momentum Deterministic Simulation Testing (DST) Harness
//!
//! This crate provides a controlled environment where the growth engine runs
//! against simulated viewers, deterministically.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advanced by the runner between watches
//! - **Traffic**: Exponential watch arrivals from their own seeded stream
//! - **Faults**: Store write failures drawn from a separate seeded stream
//! - **Randomness**: Engine draws come from a ChaCha8 RNG keyed by the seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         SimWorld                         │
//! │  ┌──────────┐   watch    ┌──────────────┐                │
//! │  │ Audience ├───────────►│ GrowthEngine │                │
//! │  └──────────┘            └──────┬───────┘                │
//! │                                 │ writes                 │
//! │                          ┌──────▼───────┐                │
//! │                          │ FaultyStore  │                │
//! │                          └──────┬───────┘                │
//! │                          ┌──────▼───────┐   snapshots    │
//! │                          │ MemoryStore  ├──────────┐     │
//! │                          └──────────────┘    ┌─────▼───┐ │
//! │                                              │ Oracle  │ │
//! │                                              └─────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use momentum_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::FlashCrowd);
//! assert!(result.passed);
//! ```

mod audience;
mod context;
mod error;
mod exporter;
mod faulty;
mod oracle;
mod runner;
mod world;
pub mod scenarios;

pub use audience::Audience;
pub use context::SimContext;
pub use error::SimError;
pub use exporter::{SimEvent, SimExport, SimFrame};
pub use faulty::{FaultyStore, StoreStats};
pub use oracle::{Oracle, Snapshot, Violation};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimEngine, SimWorld};
