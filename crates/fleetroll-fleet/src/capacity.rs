//! Verified capacity mutations.
//!
//! Mutations are never retried. Max-size, desired-capacity, and
//! termination failures are fatal — later steps depend on them having
//! taken effect. Process suspend/resume failures are surfaced loudly
//! but tolerated: a fleet left stuck mid-rollout is worse than one
//! rolling with ancillary processes still active.

use tracing::{error, info};

use fleetroll_cloud::CloudApi;
use fleetroll_core::{RolloutResult, ScalingProcess};

/// Capacity and process mutations against one fleet.
pub struct CapacityController<'a, C> {
    cloud: &'a C,
}

impl<'a, C: CloudApi> CapacityController<'a, C> {
    pub fn new(cloud: &'a C) -> Self {
        Self { cloud }
    }

    /// Set the fleet's maximum size. Fatal on failure — subsequent
    /// capacity increases depend on the headroom existing.
    pub async fn set_max_size(&self, fleet: &str, max_size: u32) -> RolloutResult<()> {
        info!(fleet, max_size, "setting max size");
        self.cloud
            .update_max_size(fleet, max_size)
            .await
            .map_err(|e| e.into_fatal(&format!("unable to set max size on `{fleet}`")))
    }

    /// Set the fleet's desired capacity, ignoring cooldowns. Fatal on
    /// failure.
    pub async fn set_desired_capacity(&self, fleet: &str, desired: u32) -> RolloutResult<()> {
        info!(fleet, desired, "setting desired capacity");
        self.cloud
            .set_desired_capacity(fleet, desired)
            .await
            .map_err(|e| e.into_fatal(&format!("unable to set desired capacity on `{fleet}`")))
    }

    /// Suspend scaling processes. Best-effort: a failure is logged as
    /// an error and the rollout continues.
    pub async fn suspend_processes(&self, fleet: &str, processes: &[ScalingProcess]) {
        info!(fleet, ?processes, "suspending scaling processes");
        if let Err(e) = self.cloud.suspend_processes(fleet, processes).await {
            error!(fleet, error = %e, "unable to suspend processes, continuing anyway");
        }
    }

    /// Resume scaling processes. Best-effort, like suspension.
    pub async fn resume_processes(&self, fleet: &str, processes: &[ScalingProcess]) {
        info!(fleet, ?processes, "resuming scaling processes");
        if let Err(e) = self.cloud.resume_processes(fleet, processes).await {
            error!(fleet, error = %e, "unable to resume processes, continuing anyway");
        }
    }

    /// Resume every suspended process. Best-effort.
    pub async fn resume_all_processes(&self, fleet: &str) {
        info!(fleet, "resuming all scaling processes");
        if let Err(e) = self.cloud.resume_all_processes(fleet).await {
            error!(fleet, error = %e, "unable to resume all processes, continuing anyway");
        }
    }

    /// Terminate a fleet member, optionally decrementing desired
    /// capacity atomically with the termination. Fatal on failure.
    pub async fn terminate_instance(
        &self,
        instance_id: &str,
        fleet: &str,
        decrement_desired_capacity: bool,
    ) -> RolloutResult<()> {
        info!(
            instance = instance_id,
            fleet, decrement_desired_capacity, "terminating instance"
        );
        self.cloud
            .terminate_instance(instance_id, decrement_desired_capacity)
            .await
            .map_err(|e| e.into_fatal(&format!("unable to terminate `{instance_id}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetroll_cloud::fake::FakeOp;
    use fleetroll_cloud::{FakeCloud, FleetSeed};
    use fleetroll_core::RolloutError;
    use fleetroll_core::ANCILLARY_PROCESSES;

    fn seeded() -> FakeCloud {
        let cloud = FakeCloud::new();
        cloud.seed_fleet(FleetSeed::new("web", 2, 2).member("i-a").member("i-b"));
        cloud
    }

    #[tokio::test]
    async fn max_size_failure_is_fatal() {
        let cloud = seeded();
        cloud.fail_op(FakeOp::UpdateMaxSize);
        let controller = CapacityController::new(&cloud);
        assert!(matches!(
            controller.set_max_size("web", 3).await,
            Err(RolloutError::Fatal(_))
        ));
    }

    #[tokio::test]
    async fn desired_capacity_failure_is_fatal() {
        let cloud = seeded();
        cloud.fail_op(FakeOp::SetDesiredCapacity);
        let controller = CapacityController::new(&cloud);
        assert!(matches!(
            controller.set_desired_capacity("web", 3).await,
            Err(RolloutError::Fatal(_))
        ));
    }

    #[tokio::test]
    async fn suspend_failure_is_tolerated() {
        let cloud = seeded();
        cloud.fail_op(FakeOp::SuspendProcesses);
        let controller = CapacityController::new(&cloud);
        // Does not return a Result at all — failure only logs.
        controller
            .suspend_processes("web", &ANCILLARY_PROCESSES)
            .await;
        assert!(cloud.current_suspended("web").is_empty());
    }

    #[tokio::test]
    async fn suspend_and_resume_round_trip() {
        let cloud = seeded();
        let controller = CapacityController::new(&cloud);

        controller
            .suspend_processes("web", &ANCILLARY_PROCESSES)
            .await;
        assert_eq!(cloud.current_suspended("web").len(), 3);

        controller
            .resume_processes("web", &ANCILLARY_PROCESSES)
            .await;
        assert!(cloud.current_suspended("web").is_empty());
    }

    #[tokio::test]
    async fn terminate_failure_is_fatal() {
        let cloud = seeded();
        cloud.fail_op(FakeOp::TerminateInstance);
        let controller = CapacityController::new(&cloud);
        assert!(matches!(
            controller.terminate_instance("i-a", "web", false).await,
            Err(RolloutError::Fatal(_))
        ));
    }
}
