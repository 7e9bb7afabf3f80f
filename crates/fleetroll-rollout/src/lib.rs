//! The fleetroll rollout engine.
//!
//! Drives a zero-downtime rolling replacement of a fleet's members:
//! expand headroom, quiesce scaling processes, converge on a healthy
//! baseline, then retire members one at a time — each retirement
//! waiting for a fresh replacement to be healthy everywhere before the
//! old member is drained and terminated — and finally restore every
//! piece of fleet configuration the run altered.
//!
//! # Components
//!
//! - **`phase`** — Rollout phase narration
//! - **`engine`** — The state machine itself

pub mod engine;
pub mod phase;

pub use engine::{RolloutEngine, RolloutSummary};
pub use phase::RolloutPhase;
