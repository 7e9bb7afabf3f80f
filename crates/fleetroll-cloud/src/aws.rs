//! AWS implementation of [`CloudApi`].
//!
//! Thin call-for-call wrappers over the autoscaling, EC2, classic ELB,
//! and ELBv2 SDK clients. Region and credentials come from the usual
//! SDK environment (profiles, env vars, IMDS); there are no flags for
//! them. Every SDK failure maps to `RolloutError::Transient` and every
//! empty lookup to `NotFound` — retry and escalation policy live in
//! the callers.

use aws_sdk_elasticloadbalancing::types::Instance as ElbInstance;
use aws_sdk_elasticloadbalancingv2::types::{TargetDescription, TargetHealthStateEnum};
use tracing::debug;

use fleetroll_core::types::{FleetDescriptor, HealthState, InstanceDetail, InstanceRef};
use fleetroll_core::{RolloutError, RolloutResult, ScalingProcess};

use crate::api::CloudApi;

/// `CloudApi` backed by the AWS control plane.
pub struct AwsCloud {
    autoscaling: aws_sdk_autoscaling::Client,
    ec2: aws_sdk_ec2::Client,
    elb: aws_sdk_elasticloadbalancing::Client,
    elbv2: aws_sdk_elasticloadbalancingv2::Client,
}

impl AwsCloud {
    /// Build clients from the default configuration chain.
    pub async fn load() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self {
            autoscaling: aws_sdk_autoscaling::Client::new(&config),
            ec2: aws_sdk_ec2::Client::new(&config),
            elb: aws_sdk_elasticloadbalancing::Client::new(&config),
            elbv2: aws_sdk_elasticloadbalancingv2::Client::new(&config),
        }
    }
}

fn transient(call: &str, err: impl std::fmt::Display) -> RolloutError {
    RolloutError::Transient(format!("{call}: {err}"))
}

/// Launch configuration name, or launch template name as a fallback,
/// for the group itself (covers mixed-instances-policy groups).
fn group_launch_config(group: &aws_sdk_autoscaling::types::AutoScalingGroup) -> Option<String> {
    if let Some(name) = group.launch_configuration_name() {
        return Some(name.to_string());
    }
    if let Some(name) = group
        .launch_template()
        .and_then(|t| t.launch_template_name())
    {
        return Some(name.to_string());
    }
    group
        .mixed_instances_policy()
        .and_then(|p| p.launch_template())
        .and_then(|t| t.launch_template_specification())
        .and_then(|s| s.launch_template_name())
        .map(|n| n.to_string())
}

fn instance_launch_config(instance: &aws_sdk_autoscaling::types::Instance) -> Option<String> {
    if let Some(name) = instance.launch_configuration_name() {
        return Some(name.to_string());
    }
    instance
        .launch_template()
        .and_then(|t| t.launch_template_name())
        .map(|n| n.to_string())
}

impl CloudApi for AwsCloud {
    async fn describe_fleet(&self, name: &str) -> RolloutResult<FleetDescriptor> {
        let out = self
            .autoscaling
            .describe_auto_scaling_groups()
            .auto_scaling_group_names(name)
            .max_records(1)
            .send()
            .await
            .map_err(|e| transient("describe-auto-scaling-groups", e))?;

        let group = out
            .auto_scaling_groups()
            .first()
            .ok_or_else(|| RolloutError::NotFound(format!("no autoscaling group `{name}`")))?;

        let members = group
            .instances()
            .iter()
            .map(|i| InstanceRef {
                instance_id: i.instance_id().unwrap_or_default().to_string(),
                health: if i.health_status() == Some("Healthy") {
                    HealthState::Healthy
                } else {
                    HealthState::Unhealthy
                },
                launch_config: instance_launch_config(i),
            })
            .collect();

        Ok(FleetDescriptor {
            name: group
                .auto_scaling_group_name()
                .unwrap_or(name)
                .to_string(),
            desired_capacity: group.desired_capacity().unwrap_or(0).max(0) as u32,
            max_size: group.max_size().unwrap_or(0).max(0) as u32,
            load_balancer_names: group.load_balancer_names().to_vec(),
            target_group_arns: group.target_group_arns().to_vec(),
            suspended_processes: group
                .suspended_processes()
                .iter()
                .filter_map(|p| p.process_name().map(|n| n.to_string()))
                .collect(),
            launch_config: group_launch_config(group),
            members,
        })
    }

    async fn describe_instance(&self, instance_id: &str) -> RolloutResult<InstanceDetail> {
        let out = self
            .ec2
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| transient("describe-instances", e))?;

        let instance = out
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .next()
            .ok_or_else(|| RolloutError::NotFound(format!("no instance `{instance_id}`")))?;

        let private_ip = instance
            .private_ip_address()
            .ok_or_else(|| {
                RolloutError::NotFound(format!("instance `{instance_id}` has no private address"))
            })?
            .to_string();

        Ok(InstanceDetail {
            instance_id: instance_id.to_string(),
            private_ip,
            public_ip: instance.public_ip_address().map(|ip| ip.to_string()),
        })
    }

    async fn load_balancer_instance_ids(&self, lb_name: &str) -> RolloutResult<Vec<String>> {
        let out = self
            .elb
            .describe_load_balancers()
            .load_balancer_names(lb_name)
            .page_size(1)
            .send()
            .await
            .map_err(|e| transient("describe-load-balancers", e))?;

        let lb = out
            .load_balancer_descriptions()
            .first()
            .ok_or_else(|| RolloutError::NotFound(format!("no load balancer `{lb_name}`")))?;

        Ok(lb
            .instances()
            .iter()
            .filter_map(|i| i.instance_id().map(|id| id.to_string()))
            .collect())
    }

    async fn load_balancer_in_service_ids(&self, lb_name: &str) -> RolloutResult<Vec<String>> {
        let out = self
            .elb
            .describe_instance_health()
            .load_balancer_name(lb_name)
            .send()
            .await
            .map_err(|e| transient("describe-instance-health", e))?;

        Ok(out
            .instance_states()
            .iter()
            .filter(|s| s.state() == Some("InService"))
            .filter_map(|s| s.instance_id().map(|id| id.to_string()))
            .collect())
    }

    async fn target_group_instance_ids(&self, tg_arn: &str) -> RolloutResult<Vec<String>> {
        let out = self
            .elbv2
            .describe_target_health()
            .target_group_arn(tg_arn)
            .send()
            .await
            .map_err(|e| transient("describe-target-health", e))?;

        Ok(out
            .target_health_descriptions()
            .iter()
            .filter_map(|d| d.target())
            .filter_map(|t| t.id().map(|id| id.to_string()))
            .collect())
    }

    async fn target_group_healthy_ids(&self, tg_arn: &str) -> RolloutResult<Vec<String>> {
        let out = self
            .elbv2
            .describe_target_health()
            .target_group_arn(tg_arn)
            .send()
            .await
            .map_err(|e| transient("describe-target-health", e))?;

        Ok(out
            .target_health_descriptions()
            .iter()
            .filter(|d| {
                matches!(
                    d.target_health().and_then(|h| h.state()),
                    Some(TargetHealthStateEnum::Healthy)
                )
            })
            .filter_map(|d| d.target())
            .filter_map(|t| t.id().map(|id| id.to_string()))
            .collect())
    }

    async fn update_max_size(&self, fleet: &str, max_size: u32) -> RolloutResult<()> {
        debug!(fleet, max_size, "update-auto-scaling-group");
        self.autoscaling
            .update_auto_scaling_group()
            .auto_scaling_group_name(fleet)
            .max_size(max_size as i32)
            .send()
            .await
            .map_err(|e| transient("update-auto-scaling-group", e))?;
        Ok(())
    }

    async fn set_desired_capacity(&self, fleet: &str, desired: u32) -> RolloutResult<()> {
        debug!(fleet, desired, "set-desired-capacity");
        self.autoscaling
            .set_desired_capacity()
            .auto_scaling_group_name(fleet)
            .desired_capacity(desired as i32)
            .honor_cooldown(false)
            .send()
            .await
            .map_err(|e| transient("set-desired-capacity", e))?;
        Ok(())
    }

    async fn suspend_processes(
        &self,
        fleet: &str,
        processes: &[ScalingProcess],
    ) -> RolloutResult<()> {
        let mut req = self
            .autoscaling
            .suspend_processes()
            .auto_scaling_group_name(fleet);
        for p in processes {
            req = req.scaling_processes(p.as_str());
        }
        req.send()
            .await
            .map_err(|e| transient("suspend-processes", e))?;
        Ok(())
    }

    async fn resume_processes(
        &self,
        fleet: &str,
        processes: &[ScalingProcess],
    ) -> RolloutResult<()> {
        let mut req = self
            .autoscaling
            .resume_processes()
            .auto_scaling_group_name(fleet);
        for p in processes {
            req = req.scaling_processes(p.as_str());
        }
        req.send()
            .await
            .map_err(|e| transient("resume-processes", e))?;
        Ok(())
    }

    async fn resume_all_processes(&self, fleet: &str) -> RolloutResult<()> {
        self.autoscaling
            .resume_processes()
            .auto_scaling_group_name(fleet)
            .send()
            .await
            .map_err(|e| transient("resume-processes", e))?;
        Ok(())
    }

    async fn terminate_instance(
        &self,
        instance_id: &str,
        decrement_desired_capacity: bool,
    ) -> RolloutResult<()> {
        debug!(
            instance_id,
            decrement_desired_capacity, "terminate-instance-in-auto-scaling-group"
        );
        self.autoscaling
            .terminate_instance_in_auto_scaling_group()
            .instance_id(instance_id)
            .should_decrement_desired_capacity(decrement_desired_capacity)
            .send()
            .await
            .map_err(|e| transient("terminate-instance-in-auto-scaling-group", e))?;
        Ok(())
    }

    async fn deregister_from_load_balancer(
        &self,
        instance_id: &str,
        lb_name: &str,
    ) -> RolloutResult<()> {
        self.elb
            .deregister_instances_from_load_balancer()
            .load_balancer_name(lb_name)
            .instances(ElbInstance::builder().instance_id(instance_id).build())
            .send()
            .await
            .map_err(|e| transient("deregister-instances-from-load-balancer", e))?;
        Ok(())
    }

    async fn deregister_from_target_group(
        &self,
        instance_id: &str,
        tg_arn: &str,
    ) -> RolloutResult<()> {
        let target = TargetDescription::builder()
            .id(instance_id)
            .build()
            .map_err(|e| RolloutError::Fatal(format!("build target description: {e}")))?;
        self.elbv2
            .deregister_targets()
            .target_group_arn(tg_arn)
            .targets(target)
            .send()
            .await
            .map_err(|e| transient("deregister-targets", e))?;
        Ok(())
    }
}
