//! The `CloudApi` trait — every control-plane call the rollout makes.
//!
//! Calls are synchronous request/response: each returns success or an
//! error, and the caller applies the read-vs-mutation retry policy
//! (reads are retried by the surrounding wait loop, mutations are
//! not). Implementations map their transport failures to
//! `RolloutError::Transient` and missing entities to
//! `RolloutError::NotFound`; escalation to `Fatal` is the caller's
//! decision.

use fleetroll_core::types::{FleetDescriptor, InstanceDetail};
use fleetroll_core::{RolloutResult, ScalingProcess};

/// Control-plane operations against one cloud account/region.
#[allow(async_fn_in_trait)]
pub trait CloudApi: Send + Sync {
    // ── Reads ─────────────────────────────────────────────────────

    /// Describe a fleet by name. `NotFound` if no fleet matches.
    async fn describe_fleet(&self, name: &str) -> RolloutResult<FleetDescriptor>;

    /// Fetch address details for a single instance. `NotFound` once
    /// the instance has been terminated — an expected race.
    async fn describe_instance(&self, instance_id: &str) -> RolloutResult<InstanceDetail>;

    /// All instance ids currently present on a classic load balancer,
    /// regardless of state. Connection draining keeps a terminating
    /// instance listed here until its connections finish.
    async fn load_balancer_instance_ids(&self, lb_name: &str) -> RolloutResult<Vec<String>>;

    /// Instance ids the classic load balancer reports as `InService`.
    async fn load_balancer_in_service_ids(&self, lb_name: &str) -> RolloutResult<Vec<String>>;

    /// All target ids currently present in a target group, regardless
    /// of target health.
    async fn target_group_instance_ids(&self, tg_arn: &str) -> RolloutResult<Vec<String>>;

    /// Target ids the target group reports with health state `healthy`.
    async fn target_group_healthy_ids(&self, tg_arn: &str) -> RolloutResult<Vec<String>>;

    // ── Mutations ─────────────────────────────────────────────────

    /// Set the fleet's maximum size.
    async fn update_max_size(&self, fleet: &str, max_size: u32) -> RolloutResult<()>;

    /// Set the fleet's desired capacity, ignoring cooldowns.
    async fn set_desired_capacity(&self, fleet: &str, desired: u32) -> RolloutResult<()>;

    /// Suspend the given scaling processes on the fleet.
    async fn suspend_processes(
        &self,
        fleet: &str,
        processes: &[ScalingProcess],
    ) -> RolloutResult<()>;

    /// Resume the given scaling processes on the fleet.
    async fn resume_processes(
        &self,
        fleet: &str,
        processes: &[ScalingProcess],
    ) -> RolloutResult<()>;

    /// Resume every suspended scaling process on the fleet.
    async fn resume_all_processes(&self, fleet: &str) -> RolloutResult<()>;

    /// Terminate an instance through its fleet. When
    /// `decrement_desired_capacity` is set the control plane lowers
    /// desired capacity atomically with the termination.
    async fn terminate_instance(
        &self,
        instance_id: &str,
        decrement_desired_capacity: bool,
    ) -> RolloutResult<()>;

    /// Deregister an instance from a classic load balancer.
    async fn deregister_from_load_balancer(
        &self,
        instance_id: &str,
        lb_name: &str,
    ) -> RolloutResult<()>;

    /// Deregister an instance from a target group.
    async fn deregister_from_target_group(
        &self,
        instance_id: &str,
        tg_arn: &str,
    ) -> RolloutResult<()>;
}
