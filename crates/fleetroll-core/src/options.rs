//! Per-invocation rollout options.
//!
//! Populated from CLI flags by the binary; tests construct them
//! directly and shrink the poll intervals.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for one rollout invocation against one fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutOptions {
    /// Name of the fleet (autoscaling group) to roll.
    pub fleet: String,
    /// Skip suspended-process pre-checks and unconditionally resume
    /// all processes. May cause downtime.
    pub force: bool,
    /// Skip traffic-source health checks as replacements come up.
    /// Usually combined with `force`. May cause downtime.
    pub skip_traffic_check: bool,
    /// Extra wait between draining a retiree and terminating it.
    pub extra_wait: Duration,
    /// External health-check command for newly launched instances.
    /// Blocks the rollout until it exits 0 for every new instance.
    pub up_check_command: Option<String>,
    /// External command run before each retiree is terminated.
    pub pre_down_command: Option<String>,
    /// External command run after each retiree is terminated.
    pub post_down_command: Option<String>,
    /// Skip members already launched from the fleet's current launch
    /// configuration or template.
    pub skip_already_updated: bool,
    /// Poll intervals for the convergence waits.
    pub intervals: PollIntervals,
}

impl RolloutOptions {
    /// Options with defaults for everything but the fleet name.
    pub fn for_fleet(fleet: impl Into<String>) -> Self {
        Self {
            fleet: fleet.into(),
            force: false,
            skip_traffic_check: false,
            extra_wait: Duration::ZERO,
            up_check_command: None,
            pre_down_command: None,
            post_down_command: None,
            skip_already_updated: false,
            intervals: PollIntervals::default(),
        }
    }
}

/// Sleep intervals used by the rollout's blocking waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollIntervals {
    /// Short settle delay after suspending processes and at the top of
    /// each retire-loop iteration.
    pub settle: Duration,
    /// Poll interval for the healthy-equals-desired capacity wait.
    pub capacity: Duration,
    /// Poll interval for traffic-source attachment/detachment waits,
    /// new-instance detection, and up-check retries.
    pub traffic: Duration,
    /// Settle before re-snapshotting healthy members and before the
    /// post-termination hook.
    pub snapshot: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(3),
            capacity: Duration::from_secs(5),
            traffic: Duration::from_secs(10),
            snapshot: Duration::from_secs(2),
        }
    }
}
