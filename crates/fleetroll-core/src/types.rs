//! Domain types for fleetroll.
//!
//! These are point-in-time snapshots of external control-plane state.
//! A `FleetDescriptor` is immutable once fetched; staleness is the
//! normal condition and consumers re-fetch at step boundaries rather
//! than mutating a shared copy.

use serde::{Deserialize, Serialize};

/// Unique identifier for a fleet member instance.
pub type InstanceId = String;

// ── Fleet ─────────────────────────────────────────────────────────

/// Snapshot of an autoscaling-group fleet at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FleetDescriptor {
    pub name: String,
    pub desired_capacity: u32,
    pub max_size: u32,
    /// Names of attached classic load balancers (possibly empty).
    pub load_balancer_names: Vec<String>,
    /// ARNs of attached target groups (possibly empty).
    pub target_group_arns: Vec<String>,
    /// Scaling processes currently suspended on the fleet.
    pub suspended_processes: Vec<String>,
    /// The launch configuration or launch template name the fleet
    /// currently launches from, when the control plane reports one.
    pub launch_config: Option<String>,
    /// Current members, in the order the control plane lists them.
    pub members: Vec<InstanceRef>,
}

impl FleetDescriptor {
    /// Members currently reporting `Healthy`, in listing order.
    pub fn healthy_members(&self) -> Vec<InstanceRef> {
        self.members
            .iter()
            .filter(|m| m.health == HealthState::Healthy)
            .cloned()
            .collect()
    }

    /// Number of members currently reporting `Healthy`.
    pub fn healthy_count(&self) -> u32 {
        self.members
            .iter()
            .filter(|m| m.health == HealthState::Healthy)
            .count() as u32
    }

    /// Whether the named scaling process is currently suspended.
    pub fn is_suspended(&self, process: ScalingProcess) -> bool {
        self.suspended_processes
            .iter()
            .any(|p| p == process.as_str())
    }

    /// All attached traffic sources: classic load balancers first,
    /// then target groups, preserving listing order.
    pub fn traffic_sources(&self) -> Vec<TrafficSource> {
        self.load_balancer_names
            .iter()
            .map(|n| TrafficSource::ClassicLoadBalancer(n.clone()))
            .chain(
                self.target_group_arns
                    .iter()
                    .map(|a| TrafficSource::TargetGroup(a.clone())),
            )
            .collect()
    }
}

// ── Instance ──────────────────────────────────────────────────────

/// Health of a fleet member as reported by the fleet itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// A fleet member as listed on the fleet descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRef {
    pub instance_id: InstanceId,
    pub health: HealthState,
    /// Launch configuration or launch template name that produced this
    /// instance, when the control plane reports one.
    pub launch_config: Option<String>,
}

/// Richer, on-demand view of a single instance.
///
/// Fetched lazily — only for instances about to be retired or just
/// launched — to keep control-plane query volume down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceDetail {
    pub instance_id: InstanceId,
    pub private_ip: String,
    pub public_ip: Option<String>,
}

// ── Traffic sources ───────────────────────────────────────────────

/// A traffic source the fleet is registered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrafficSource {
    /// A classic ELB, identified by name. "In service" means the
    /// source reports instance state `InService`.
    ClassicLoadBalancer(String),
    /// An ALB/NLB target group, identified by ARN. "In service" means
    /// target health state `healthy`.
    TargetGroup(String),
}

impl std::fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficSource::ClassicLoadBalancer(name) => write!(f, "load balancer {name}"),
            TrafficSource::TargetGroup(arn) => write!(f, "target group {arn}"),
        }
    }
}

// ── Scaling processes ─────────────────────────────────────────────

/// Autoscaling processes the rollout inspects, suspends, or resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingProcess {
    Terminate,
    Launch,
    HealthCheck,
    AddToLoadBalancer,
    ScheduledActions,
    AlarmNotification,
    AzRebalance,
}

impl ScalingProcess {
    /// The control-plane process name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingProcess::Terminate => "Terminate",
            ScalingProcess::Launch => "Launch",
            ScalingProcess::HealthCheck => "HealthCheck",
            ScalingProcess::AddToLoadBalancer => "AddToLoadBalancer",
            ScalingProcess::ScheduledActions => "ScheduledActions",
            ScalingProcess::AlarmNotification => "AlarmNotification",
            ScalingProcess::AzRebalance => "AZRebalance",
        }
    }
}

impl std::fmt::Display for ScalingProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processes that must NOT be suspended for a rollout to proceed —
/// the control plane has to launch, terminate, health-check, and
/// attach instances on its own.
pub const REQUIRED_PROCESSES: [ScalingProcess; 4] = [
    ScalingProcess::Terminate,
    ScalingProcess::Launch,
    ScalingProcess::HealthCheck,
    ScalingProcess::AddToLoadBalancer,
];

/// Processes suspended for the duration of a rollout so nothing
/// external interferes with capacity mid-run.
pub const ANCILLARY_PROCESSES: [ScalingProcess; 3] = [
    ScalingProcess::ScheduledActions,
    ScalingProcess::AlarmNotification,
    ScalingProcess::AzRebalance,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, health: HealthState) -> InstanceRef {
        InstanceRef {
            instance_id: id.to_string(),
            health,
            launch_config: Some("lc-v2".to_string()),
        }
    }

    fn fleet() -> FleetDescriptor {
        FleetDescriptor {
            name: "web".to_string(),
            desired_capacity: 2,
            max_size: 4,
            load_balancer_names: vec!["lb-a".to_string()],
            target_group_arns: vec!["tg-b".to_string()],
            suspended_processes: vec!["Launch".to_string()],
            launch_config: Some("lc-v2".to_string()),
            members: vec![
                member("i-1", HealthState::Healthy),
                member("i-2", HealthState::Unhealthy),
                member("i-3", HealthState::Healthy),
            ],
        }
    }

    #[test]
    fn healthy_members_filters_and_preserves_order() {
        let healthy = fleet().healthy_members();
        let ids: Vec<_> = healthy.iter().map(|m| m.instance_id.as_str()).collect();
        assert_eq!(ids, ["i-1", "i-3"]);
        assert_eq!(fleet().healthy_count(), 2);
    }

    #[test]
    fn suspended_process_lookup() {
        let f = fleet();
        assert!(f.is_suspended(ScalingProcess::Launch));
        assert!(!f.is_suspended(ScalingProcess::Terminate));
    }

    #[test]
    fn traffic_sources_list_lbs_before_target_groups() {
        let sources = fleet().traffic_sources();
        assert_eq!(
            sources,
            vec![
                TrafficSource::ClassicLoadBalancer("lb-a".to_string()),
                TrafficSource::TargetGroup("tg-b".to_string()),
            ]
        );
    }

    #[test]
    fn process_names_match_control_plane_spelling() {
        assert_eq!(ScalingProcess::AzRebalance.as_str(), "AZRebalance");
        assert_eq!(ScalingProcess::AddToLoadBalancer.as_str(), "AddToLoadBalancer");
    }
}
