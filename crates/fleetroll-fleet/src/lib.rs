//! Fleet access for fleetroll.
//!
//! Two views of one fleet: read-only inspection (descriptors, healthy
//! members, scaling detection, instance details) and the capacity
//! mutations the rollout performs (max size, desired capacity, process
//! suspension, termination), each with its own failure policy.
//!
//! # Components
//!
//! - **`inspect`** — `FleetInspector`, read-only queries
//! - **`capacity`** — `CapacityController`, verified mutations

pub mod capacity;
pub mod inspect;

pub use capacity::CapacityController;
pub use inspect::FleetInspector;
