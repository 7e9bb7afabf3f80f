//! Read-only fleet queries.
//!
//! Everything here is a point-in-time snapshot of eventually-consistent
//! control-plane state. Callers re-fetch at each step boundary instead
//! of trusting a single sample.

use tracing::{debug, info};

use fleetroll_cloud::CloudApi;
use fleetroll_core::types::{FleetDescriptor, InstanceDetail, InstanceRef};
use fleetroll_core::{RolloutError, RolloutResult};

/// Read-only queries against one fleet.
pub struct FleetInspector<'a, C> {
    cloud: &'a C,
}

impl<'a, C: CloudApi> FleetInspector<'a, C> {
    pub fn new(cloud: &'a C) -> Self {
        Self { cloud }
    }

    /// Resolve a fleet's current descriptor.
    pub async fn get_fleet(&self, name: &str) -> RolloutResult<FleetDescriptor> {
        self.cloud.describe_fleet(name).await
    }

    /// Fresh snapshot of the fleet's currently-healthy members.
    pub async fn healthy_members(&self, name: &str) -> RolloutResult<Vec<InstanceRef>> {
        Ok(self.cloud.describe_fleet(name).await?.healthy_members())
    }

    /// Whether the fleet appears to be mid-scaling right now: a fresh
    /// describe whose healthy count differs from desired capacity.
    /// A single sample proves nothing — callers must re-poll.
    pub async fn is_scaling(&self, name: &str) -> RolloutResult<bool> {
        let fleet = self.cloud.describe_fleet(name).await?;
        let healthy = fleet.healthy_count();
        if healthy != fleet.desired_capacity {
            info!(
                fleet = name,
                desired = fleet.desired_capacity,
                healthy,
                "fleet appears to be scaling"
            );
            return Ok(true);
        }
        Ok(false)
    }

    /// Address details for one instance. `NotFound` once it has been
    /// terminated — an expected race after termination elsewhere.
    pub async fn instance_detail(&self, instance_id: &str) -> RolloutResult<InstanceDetail> {
        self.cloud.describe_instance(instance_id).await
    }

    /// Members already launched from the fleet's current launch
    /// configuration or template — candidates to skip when the caller
    /// only wants to replace outdated instances. Errors if the fleet's
    /// own configuration cannot be determined.
    pub fn members_already_updated(
        &self,
        fleet: &FleetDescriptor,
        members: &[InstanceRef],
    ) -> RolloutResult<Vec<InstanceRef>> {
        let fleet_config = fleet.launch_config.as_deref().ok_or_else(|| {
            RolloutError::NotFound(format!(
                "no launch configuration or template on fleet `{}`",
                fleet.name
            ))
        })?;

        let mut updated = Vec::new();
        for member in members {
            if member.launch_config.as_deref() == Some(fleet_config) {
                debug!(
                    instance = %member.instance_id,
                    config = fleet_config,
                    "instance already on current launch config"
                );
                updated.push(member.clone());
            }
        }
        Ok(updated)
    }
}
