//! The control-plane boundary for fleetroll.
//!
//! Everything the rollout knows about the outside world goes through
//! the [`CloudApi`] trait: fleet descriptions, instance details,
//! traffic-source membership, and the capacity/process/termination
//! mutations. Handles are passed explicitly so the state machine and
//! component tests can substitute the in-memory [`FakeCloud`].
//!
//! # Components
//!
//! - **`api`** — The `CloudApi` trait
//! - **`fake`** — In-memory control-plane simulation for tests
//! - **`aws`** — Real AWS implementation (feature `aws`)

pub mod api;
pub mod fake;

#[cfg(feature = "aws")]
pub mod aws;

pub use api::CloudApi;
pub use fake::{FakeCloud, FleetSeed, TerminationCall};

#[cfg(feature = "aws")]
pub use aws::AwsCloud;
