//! Core types for fleetroll — the rolling-replacement orchestrator for
//! autoscaling-group fleets.
//!
//! # Components
//!
//! - **`types`** — Fleet/instance snapshots, traffic sources, scaling processes
//! - **`error`** — The `RolloutError` taxonomy (not-found / transient / fatal / hook)
//! - **`options`** — Per-invocation rollout options and poll intervals
//! - **`wait`** — The `poll_until` convergence-wait primitive

pub mod error;
pub mod options;
pub mod types;
pub mod wait;

pub use error::{RolloutError, RolloutResult};
pub use options::{PollIntervals, RolloutOptions};
pub use types::{
    FleetDescriptor, HealthState, InstanceDetail, InstanceRef, ScalingProcess, TrafficSource,
    ANCILLARY_PROCESSES, REQUIRED_PROCESSES,
};
pub use wait::poll_until;
