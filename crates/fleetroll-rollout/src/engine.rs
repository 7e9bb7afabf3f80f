//! The rollout state machine.
//!
//! One invocation rolls one fleet: expand headroom, quiesce ancillary
//! scaling processes, converge on a healthy fully-attached baseline,
//! then retire the planned members one at a time. Each retirement
//! waits for the replacement to be healthy and in service everywhere
//! before the retiree is drained and terminated. Restoration of
//! desired capacity, suspended processes, and max size happens on the
//! forward path only: an interrupted run leaves the fleet as-is for
//! the operator.

use tracing::{error, info, warn};

use fleetroll_cloud::CloudApi;
use fleetroll_core::types::{InstanceDetail, InstanceRef, TrafficSource};
use fleetroll_core::{
    poll_until, RolloutError, RolloutOptions, RolloutResult, ANCILLARY_PROCESSES,
    REQUIRED_PROCESSES,
};
use fleetroll_fleet::{CapacityController, FleetInspector};
use fleetroll_hooks::SubstitutionTable;
use fleetroll_traffic::AttachmentTracker;
use serde::{Deserialize, Serialize};

use crate::phase::RolloutPhase;

/// What a completed rollout did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutSummary {
    pub fleet: String,
    /// Instance ids terminated, in retirement order.
    pub retired: Vec<String>,
    /// Members left alone because they already ran the fleet's current
    /// launch configuration.
    pub skipped_already_updated: usize,
}

/// Working state carried through one run.
///
/// Exactly one termination in the whole run may decrement desired
/// capacity: the last retiree. If no termination decremented, the run
/// compensates with an explicit set-desired-capacity at the end.
struct RolloutPlan {
    original_max_size: u32,
    original_desired_capacity: u32,
    headroom_bumped: bool,
    downscale_applied: bool,
    retirees: Vec<InstanceRef>,
    retired: Vec<String>,
    skipped_already_updated: usize,
}

/// Drives one rolling replacement against one fleet.
pub struct RolloutEngine<'a, C> {
    cloud: &'a C,
    options: RolloutOptions,
}

impl<'a, C: CloudApi> RolloutEngine<'a, C> {
    pub fn new(cloud: &'a C, options: RolloutOptions) -> Self {
        Self { cloud, options }
    }

    /// Run the rollout to completion. An `Err` means the run aborted
    /// mid-way; the restoration steps after the failure point did not
    /// run.
    pub async fn run(&self) -> RolloutResult<RolloutSummary> {
        let name = self.options.fleet.as_str();
        let inspector = FleetInspector::new(self.cloud);
        let capacity = CapacityController::new(self.cloud);
        let tracker = AttachmentTracker::new(self.cloud, self.options.intervals.traffic);

        if self.options.force {
            warn!(
                fleet = name,
                "force mode: process-state checks and drain verification are skipped, \
                 downtime is possible"
            );
        }
        if self.options.skip_traffic_check {
            warn!(
                fleet = name,
                "traffic checks disabled: replacements will not be verified in service, \
                 downtime is possible"
            );
        }

        // Validate: resolve the fleet or abort before touching anything.
        info!(phase = %RolloutPhase::Validate, fleet = name, "starting rollout");
        let fleet = self
            .cloud
            .describe_fleet(name)
            .await
            .map_err(|e| e.into_fatal(&format!("unable to resolve fleet `{name}`")))?;
        let sources = fleet.traffic_sources();
        info!(
            fleet = name,
            desired = fleet.desired_capacity,
            max = fleet.max_size,
            members = fleet.members.len(),
            sources = sources.len(),
            "fleet resolved"
        );
        if sources.is_empty() {
            info!(fleet = name, "fleet is not attached to any traffic source");
        }
        for source in &sources {
            info!(fleet = name, %source, "attached traffic source");
        }

        let mut plan = RolloutPlan {
            original_max_size: fleet.max_size,
            original_desired_capacity: fleet.desired_capacity,
            headroom_bumped: false,
            downscale_applied: false,
            retirees: Vec::new(),
            retired: Vec::new(),
            skipped_already_updated: 0,
        };

        // Expand headroom so a replacement can launch alongside the
        // member it replaces.
        if fleet.desired_capacity == fleet.max_size {
            info!(
                phase = %RolloutPhase::ExpandHeadroom,
                fleet = name,
                "max size equals desired capacity, raising max size by one"
            );
            capacity
                .set_max_size(name, plan.original_max_size + 1)
                .await?;
            plan.headroom_bumped = true;
        }

        if self.options.force {
            // Force skips the process-state check and instead starts
            // from a clean slate.
            capacity.resume_all_processes(name).await;
        } else {
            info!(phase = %RolloutPhase::ValidateProcessState, fleet = name, "checking scaling processes");
            for process in REQUIRED_PROCESSES {
                if fleet.is_suspended(process) {
                    return Err(RolloutError::Fatal(format!(
                        "scaling process {process} is suspended on `{name}`; \
                         the fleet cannot replace members on its own — resume it or rerun with force"
                    )));
                }
            }
        }

        info!(phase = %RolloutPhase::SuspendAncillary, fleet = name, "quiescing ancillary processes");
        capacity.suspend_processes(name, &ANCILLARY_PROCESSES).await;
        tokio::time::sleep(self.options.intervals.settle).await;

        info!(phase = %RolloutPhase::ConvergeBaseline, fleet = name, "converging on a healthy baseline");
        self.wait_for_stable_capacity(&inspector).await?;

        if !self.options.force {
            info!(phase = %RolloutPhase::ConvergeTraffic, fleet = name, "verifying baseline attachment");
            for source in &sources {
                tracker.wait_for_full_attachment(source, name).await?;
            }
        }

        // Plan which members to retire, from a fresh snapshot.
        info!(phase = %RolloutPhase::PlanRetirees, fleet = name, "planning retirements");
        let snapshot = inspector.healthy_members(name).await?;
        plan.retirees = snapshot.clone();
        if self.options.skip_already_updated {
            let fresh = inspector.get_fleet(name).await?;
            let updated = inspector.members_already_updated(&fresh, &plan.retirees)?;
            plan.skipped_already_updated = updated.len();
            plan.retirees
                .retain(|m| !updated.iter().any(|u| u.instance_id == m.instance_id));
            info!(
                fleet = name,
                skipped = plan.skipped_already_updated,
                "members already on the current launch configuration"
            );
        }
        info!(
            fleet = name,
            retirees = ?plan.retirees.iter().map(|m| m.instance_id.as_str()).collect::<Vec<_>>(),
            "retirement plan"
        );

        // One extra instance at a time, not one per retiree: this is
        // what bounds the blast radius of the whole run.
        if plan.retirees.is_empty() {
            info!(fleet = name, "no members need replacing");
        } else {
            info!(phase = %RolloutPhase::BumpForReplacement, fleet = name, "raising desired capacity by one");
            capacity
                .set_desired_capacity(name, plan.original_desired_capacity + 1)
                .await?;
        }

        // The membership snapshot replacements are detected against.
        // Refreshed each iteration just before the retiree terminates.
        let mut current_members = snapshot;

        let total = plan.retirees.len();
        let retirees = plan.retirees.clone();
        for (index, retiree) in retirees.iter().enumerate() {
            let id = retiree.instance_id.as_str();
            info!(
                phase = %RolloutPhase::Retire { current: index + 1, total },
                fleet = name,
                instance = id,
                "retiring member"
            );
            tokio::time::sleep(self.options.intervals.settle).await;

            // Grab address details now, before the instance is gone.
            let detail = inspector
                .instance_detail(id)
                .await
                .map_err(|e| e.into_fatal(&format!("unable to describe retiree `{id}`")))?;

            self.wait_for_stable_capacity(&inspector).await?;
            let arrivals = tracker.wait_for_new_members(name, &current_members).await?;

            if !self.options.skip_traffic_check {
                for source in &sources {
                    tracker.wait_for_full_attachment(source, name).await?;
                }
            }

            if let Some(command) = &self.options.up_check_command {
                self.run_up_checks(&inspector, command, &arrivals).await?;
            }

            // Drain the retiree out of every source before it dies.
            self.deregister_everywhere(id, &sources).await;
            for source in &sources {
                tracker
                    .wait_for_detachment(std::slice::from_ref(&retiree.instance_id), source)
                    .await?;
            }

            if let Some(command) = &self.options.pre_down_command {
                self.run_down_hook("pre-down", command, &detail).await;
            }

            if !self.options.extra_wait.is_zero() {
                info!(
                    fleet = name,
                    instance = id,
                    wait = ?self.options.extra_wait,
                    "extra wait before termination"
                );
                tokio::time::sleep(self.options.extra_wait).await;
            }

            // Snapshot while the retiree is still a member, so the
            // next iteration sees only its own replacement as new.
            tokio::time::sleep(self.options.intervals.snapshot).await;
            current_members = inspector.healthy_members(name).await?;

            let last = index + 1 == total;
            capacity.terminate_instance(id, name, last).await?;
            if last {
                plan.downscale_applied = true;
            }
            plan.retired.push(retiree.instance_id.clone());

            if let Some(command) = &self.options.post_down_command {
                tokio::time::sleep(self.options.intervals.snapshot).await;
                self.run_down_hook("post-down", command, &detail).await;
            }
        }

        if !self.options.force {
            info!(phase = %RolloutPhase::DrainVerify, fleet = name, "verifying retirees drained everywhere");
            for source in &sources {
                tracker.wait_for_detachment(&plan.retired, source).await?;
            }
        }

        // The last termination normally decrements desired capacity
        // back to the original; compensate when it did not.
        if !plan.downscale_applied {
            info!(phase = %RolloutPhase::RestoreCapacity, fleet = name, "restoring desired capacity");
            capacity
                .set_desired_capacity(name, plan.original_desired_capacity)
                .await?;
        }

        info!(phase = %RolloutPhase::ResumeProcesses, fleet = name, "resuming scaling processes");
        if self.options.force {
            capacity.resume_all_processes(name).await;
        } else {
            capacity.resume_processes(name, &ANCILLARY_PROCESSES).await;
        }

        if plan.headroom_bumped {
            info!(phase = %RolloutPhase::RestoreHeadroom, fleet = name, "restoring max size");
            capacity.set_max_size(name, plan.original_max_size).await?;
        }

        info!(
            phase = %RolloutPhase::Done,
            fleet = name,
            retired = plan.retired.len(),
            "rollout complete"
        );
        Ok(RolloutSummary {
            fleet: name.to_string(),
            retired: plan.retired,
            skipped_already_updated: plan.skipped_already_updated,
        })
    }

    /// Block until the fleet's healthy-member count equals desired
    /// capacity and a follow-up scaling check agrees. Unbounded.
    async fn wait_for_stable_capacity(
        &self,
        inspector: &FleetInspector<'_, C>,
    ) -> RolloutResult<()> {
        let name = self.options.fleet.as_str();
        poll_until(
            "stable capacity",
            self.options.intervals.capacity,
            None,
            || async move {
                let fleet = inspector.get_fleet(name).await?;
                let healthy = fleet.healthy_count();
                if healthy != fleet.desired_capacity {
                    info!(
                        fleet = name,
                        healthy,
                        desired = fleet.desired_capacity,
                        "healthy members do not match desired capacity yet"
                    );
                    return Ok(None);
                }
                if inspector.is_scaling(name).await? {
                    return Ok(None);
                }
                Ok(Some(()))
            },
        )
        .await
    }

    /// Run the configured up-check against every new arrival, retrying
    /// the whole batch until each invocation exits 0. An instance
    /// whose details cannot be resolved counts as a failed check, not
    /// an abort.
    async fn run_up_checks(
        &self,
        inspector: &FleetInspector<'_, C>,
        command: &str,
        arrivals: &[InstanceRef],
    ) -> RolloutResult<()> {
        info!(
            command,
            instances = arrivals.len(),
            "running up-check against new instances"
        );
        poll_until(
            "up-check",
            self.options.intervals.traffic,
            None,
            || async move {
                for arrival in arrivals {
                    let id = arrival.instance_id.as_str();
                    let detail = match inspector.instance_detail(id).await {
                        Ok(detail) => detail,
                        Err(e) => {
                            warn!(instance = id, error = %e, "cannot resolve detail for up-check");
                            return Ok(None);
                        }
                    };
                    let rendered = SubstitutionTable::for_new_instance(&detail).apply(command);
                    match fleetroll_hooks::invoke(&rendered).await {
                        Ok(true) => info!(instance = id, "up-check passed"),
                        Ok(false) => return Ok(None),
                        Err(e) => {
                            warn!(instance = id, error = %e, "up-check could not run");
                            return Ok(None);
                        }
                    }
                }
                Ok(Some(()))
            },
        )
        .await
    }

    /// Run a pre- or post-termination hook for one retiree. Failures
    /// are logged and never abort the rollout.
    async fn run_down_hook(&self, label: &str, command: &str, detail: &InstanceDetail) {
        let rendered = SubstitutionTable::for_old_instance(detail).apply(command);
        match fleetroll_hooks::invoke(&rendered).await {
            Ok(true) => {}
            Ok(false) => warn!(
                hook = label,
                instance = %detail.instance_id,
                "hook exited non-zero, continuing"
            ),
            Err(e) => warn!(
                hook = label,
                instance = %detail.instance_id,
                error = %e,
                "hook could not run, continuing"
            ),
        }
    }

    /// Deregister one instance from every attached source.
    /// Best-effort per source: draining is re-verified afterwards.
    async fn deregister_everywhere(&self, instance_id: &str, sources: &[TrafficSource]) {
        for source in sources {
            info!(instance = instance_id, %source, "deregistering");
            let result = match source {
                TrafficSource::ClassicLoadBalancer(lb) => {
                    self.cloud.deregister_from_load_balancer(instance_id, lb).await
                }
                TrafficSource::TargetGroup(tg) => {
                    self.cloud.deregister_from_target_group(instance_id, tg).await
                }
            };
            if let Err(e) = result {
                error!(
                    instance = instance_id,
                    %source,
                    error = %e,
                    "unable to deregister, relying on drain verification"
                );
            }
        }
    }
}
