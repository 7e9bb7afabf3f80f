//! Attachment and detachment convergence waits.
//!
//! All waits here are unbounded by default: a fleet that never
//! converges is an operator problem, narrated in the logs, not an
//! auto-recovered one. The deadline hook exists for tests and for
//! callers that want a safety net.

use std::time::Duration;

use tracing::{debug, info, warn};

use fleetroll_cloud::CloudApi;
use fleetroll_core::types::{InstanceRef, TrafficSource};
use fleetroll_core::{poll_until, RolloutResult};

/// Instances present in `current` but not in `previous`, by id, in
/// `current`'s order. Empty when `current` is a subset of `previous`.
pub fn newly_appeared(previous: &[InstanceRef], current: &[InstanceRef]) -> Vec<InstanceRef> {
    current
        .iter()
        .filter(|c| !previous.iter().any(|p| p.instance_id == c.instance_id))
        .cloned()
        .collect()
}

/// Convergence waits against traffic sources for one fleet.
pub struct AttachmentTracker<'a, C> {
    cloud: &'a C,
    /// Poll interval for every wait loop.
    interval: Duration,
    /// Optional upper bound per wait; `None` polls forever.
    deadline: Option<Duration>,
}

impl<'a, C: CloudApi> AttachmentTracker<'a, C> {
    pub fn new(cloud: &'a C, interval: Duration) -> Self {
        Self {
            cloud,
            interval,
            deadline: None,
        }
    }

    /// Bound every wait by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    async fn in_service_ids(&self, source: &TrafficSource) -> RolloutResult<Vec<String>> {
        match source {
            TrafficSource::ClassicLoadBalancer(name) => {
                self.cloud.load_balancer_in_service_ids(name).await
            }
            TrafficSource::TargetGroup(arn) => self.cloud.target_group_healthy_ids(arn).await,
        }
    }

    async fn present_ids(&self, source: &TrafficSource) -> RolloutResult<Vec<String>> {
        match source {
            TrafficSource::ClassicLoadBalancer(name) => {
                self.cloud.load_balancer_instance_ids(name).await
            }
            TrafficSource::TargetGroup(arn) => self.cloud.target_group_instance_ids(arn).await,
        }
    }

    /// Block until every currently-healthy member of `fleet_name` is
    /// in service on `source` AND the in-service count equals the
    /// fleet's current desired capacity.
    ///
    /// The desired-capacity comparison is what keeps this from
    /// exiting early mid-scale-up, when the healthy-member list is
    /// itself still moving.
    pub async fn wait_for_full_attachment(
        &self,
        source: &TrafficSource,
        fleet_name: &str,
    ) -> RolloutResult<()> {
        info!(%source, fleet = fleet_name, "waiting for full attachment");
        poll_until(
            "full attachment",
            self.interval,
            self.deadline,
            || async move {
                let in_service = self.in_service_ids(source).await?;
                let fleet = self.cloud.describe_fleet(fleet_name).await?;
                let members = fleet.healthy_members();

                let mut attached = 0usize;
                for member in &members {
                    if in_service.contains(&member.instance_id) {
                        debug!(%source, instance = %member.instance_id, "in service");
                        attached += 1;
                    } else {
                        info!(
                            %source,
                            instance = %member.instance_id,
                            "not yet in service"
                        );
                    }
                }

                if attached < members.len() {
                    info!(
                        %source,
                        attached,
                        healthy = members.len(),
                        "still waiting for members to attach"
                    );
                    return Ok(None);
                }
                if in_service.len() as u32 != fleet.desired_capacity {
                    info!(
                        %source,
                        in_service = in_service.len(),
                        desired = fleet.desired_capacity,
                        "in-service count does not match desired capacity yet"
                    );
                    return Ok(None);
                }
                info!(
                    %source,
                    in_service = in_service.len(),
                    "fleet fully attached"
                );
                Ok(Some(()))
            },
        )
        .await
    }

    /// Block until none of `instance_ids` remain present on `source`,
    /// in any state. Presence alone blocks: connection draining keeps
    /// a terminating instance listed until its connections finish.
    pub async fn wait_for_detachment(
        &self,
        instance_ids: &[String],
        source: &TrafficSource,
    ) -> RolloutResult<()> {
        if instance_ids.is_empty() {
            return Ok(());
        }
        info!(%source, ?instance_ids, "waiting for detachment");
        poll_until("detachment", self.interval, self.deadline, || async move {
            let present = self.present_ids(source).await?;
            let lingering: Vec<&String> = instance_ids
                .iter()
                .filter(|id| present.contains(id))
                .collect();
            if lingering.is_empty() {
                info!(%source, "all instances detached");
                Ok(Some(()))
            } else {
                info!(%source, ?lingering, "instances still attached");
                Ok(None)
            }
        })
        .await
    }

    /// Block until at least one instance appears among the fleet's
    /// healthy members that was not in `previous`, and return the new
    /// arrivals.
    pub async fn wait_for_new_members(
        &self,
        fleet_name: &str,
        previous: &[InstanceRef],
    ) -> RolloutResult<Vec<InstanceRef>> {
        info!(fleet = fleet_name, "waiting for new instances to appear");
        poll_until("new instances", self.interval, self.deadline, || async move {
            let fleet = self.cloud.describe_fleet(fleet_name).await?;
            let arrivals = newly_appeared(previous, &fleet.healthy_members());
            if arrivals.is_empty() {
                warn!(fleet = fleet_name, "no new instances yet");
                Ok(None)
            } else {
                info!(
                    fleet = fleet_name,
                    arrivals = ?arrivals.iter().map(|a| a.instance_id.as_str()).collect::<Vec<_>>(),
                    "new instances appeared"
                );
                Ok(Some(arrivals))
            }
        })
        .await
    }
}
