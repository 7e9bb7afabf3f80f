//! Rollout phase narration.
//!
//! Phases exist for the operator reading the logs: the engine is a
//! straight-line sequence, not a resumable state store.

use serde::{Deserialize, Serialize};

/// The step the rollout is currently executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RolloutPhase {
    /// Resolving the fleet and snapshotting its configuration.
    Validate,
    /// Raising max size so a replacement can launch alongside a retiree.
    ExpandHeadroom,
    /// Checking that no required scaling process is suspended.
    ValidateProcessState,
    /// Suspending ancillary processes for the duration of the run.
    SuspendAncillary,
    /// Waiting for healthy members to match desired capacity.
    ConvergeBaseline,
    /// Waiting for the fleet to be fully in service everywhere.
    ConvergeTraffic,
    /// Choosing which members to retire.
    PlanRetirees,
    /// Raising desired capacity by one to force a replacement launch.
    BumpForReplacement,
    /// Replacing and draining one retiree.
    Retire { current: usize, total: usize },
    /// Verifying all retired members drained out of every traffic source.
    DrainVerify,
    /// Putting desired capacity back where it started.
    RestoreCapacity,
    /// Resuming the processes the run suspended.
    ResumeProcesses,
    /// Shrinking max size back to its original value.
    RestoreHeadroom,
    /// Terminal: the rollout succeeded.
    Done,
}

impl std::fmt::Display for RolloutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RolloutPhase::Validate => write!(f, "validate"),
            RolloutPhase::ExpandHeadroom => write!(f, "expand-headroom"),
            RolloutPhase::ValidateProcessState => write!(f, "validate-process-state"),
            RolloutPhase::SuspendAncillary => write!(f, "suspend-ancillary"),
            RolloutPhase::ConvergeBaseline => write!(f, "converge-baseline"),
            RolloutPhase::ConvergeTraffic => write!(f, "converge-traffic"),
            RolloutPhase::PlanRetirees => write!(f, "plan-retirees"),
            RolloutPhase::BumpForReplacement => write!(f, "bump-for-replacement"),
            RolloutPhase::Retire { current, total } => write!(f, "retire {current}/{total}"),
            RolloutPhase::DrainVerify => write!(f, "drain-verify"),
            RolloutPhase::RestoreCapacity => write!(f, "restore-capacity"),
            RolloutPhase::ResumeProcesses => write!(f, "resume-processes"),
            RolloutPhase::RestoreHeadroom => write!(f, "restore-headroom"),
            RolloutPhase::Done => write!(f, "done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retire_phase_renders_progress() {
        let phase = RolloutPhase::Retire {
            current: 2,
            total: 5,
        };
        assert_eq!(phase.to_string(), "retire 2/5");
    }
}
