//! In-memory control-plane simulation.
//!
//! `FakeCloud` models the parts of the control plane the rollout
//! observes: a fleet launches replacements when desired capacity
//! exceeds membership, new instances take a few polls to become
//! visible, traffic sources take a few polls to mark a registered
//! instance in-service, and deregistered instances linger in a
//! draining state before disappearing. Delays are counted in describe
//! calls rather than wall time so tests drive them by polling.
//!
//! Every mutation is recorded; tests assert against the call log.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use fleetroll_core::types::{FleetDescriptor, HealthState, InstanceDetail, InstanceRef};
use fleetroll_core::{RolloutError, RolloutResult, ScalingProcess};

use crate::api::CloudApi;

/// Mutation kinds that can be made to fail for error-policy tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    UpdateMaxSize,
    SetDesiredCapacity,
    SuspendProcesses,
    ResumeProcesses,
    TerminateInstance,
    DeregisterLoadBalancer,
    DeregisterTargetGroup,
}

/// A recorded terminate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationCall {
    pub instance_id: String,
    pub decrement: bool,
}

/// Seed description of a fleet and its attachments.
#[derive(Debug, Clone)]
pub struct FleetSeed {
    pub name: String,
    pub desired: u32,
    pub max: u32,
    pub launch_config: Option<String>,
    /// (instance id, launch config) pairs; all seeded healthy.
    pub members: Vec<(String, Option<String>)>,
    pub suspended: Vec<String>,
    pub load_balancers: Vec<String>,
    pub target_groups: Vec<String>,
}

impl FleetSeed {
    pub fn new(name: &str, desired: u32, max: u32) -> Self {
        Self {
            name: name.to_string(),
            desired,
            max,
            launch_config: Some("lc-current".to_string()),
            members: Vec::new(),
            suspended: Vec::new(),
            load_balancers: Vec::new(),
            target_groups: Vec::new(),
        }
    }

    /// Add a healthy member launched from an older config.
    pub fn member(mut self, id: &str) -> Self {
        self.members
            .push((id.to_string(), Some("lc-old".to_string())));
        self
    }

    /// Add a healthy member with an explicit launch config.
    pub fn member_with_config(mut self, id: &str, config: &str) -> Self {
        self.members
            .push((id.to_string(), Some(config.to_string())));
        self
    }

    pub fn launch_config(mut self, config: &str) -> Self {
        self.launch_config = Some(config.to_string());
        self
    }

    pub fn suspended(mut self, process: &str) -> Self {
        self.suspended.push(process.to_string());
        self
    }

    pub fn load_balancer(mut self, name: &str) -> Self {
        self.load_balancers.push(name.to_string());
        self
    }

    pub fn target_group(mut self, arn: &str) -> Self {
        self.target_groups.push(arn.to_string());
        self
    }
}

struct Member {
    id: String,
    launch_config: Option<String>,
    /// Describe calls left before this instance becomes visible and
    /// healthy on the fleet. Zero for seeded members.
    launch_countdown: u32,
}

struct Fleet {
    desired: u32,
    max: u32,
    launch_config: Option<String>,
    suspended: BTreeSet<String>,
    members: Vec<Member>,
    load_balancers: Vec<String>,
    target_groups: Vec<String>,
}

struct SourceMember {
    /// Source polls left before the member reports in-service.
    in_service_countdown: u32,
    /// Present while draining: polls left before the member drops out
    /// of the source's listing entirely.
    drain_countdown: Option<u32>,
}

#[derive(Default)]
struct Source {
    members: HashMap<String, SourceMember>,
}

impl Source {
    fn tick(&mut self) {
        self.members.retain(|_, m| match m.drain_countdown {
            Some(0) => false,
            Some(n) => {
                m.drain_countdown = Some(n - 1);
                true
            }
            None => {
                m.in_service_countdown = m.in_service_countdown.saturating_sub(1);
                true
            }
        });
    }

    fn present_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.members.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn in_service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .members
            .iter()
            .filter(|(_, m)| m.drain_countdown.is_none() && m.in_service_countdown == 0)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn register(&mut self, id: &str, delay: u32) {
        self.members
            .entry(id.to_string())
            .or_insert_with(|| SourceMember {
                in_service_countdown: delay,
                drain_countdown: None,
            });
    }

    fn deregister(&mut self, id: &str, drain: u32) {
        if let Some(m) = self.members.get_mut(id) {
            m.drain_countdown = Some(drain);
        }
    }
}

#[derive(Default)]
struct CallLog {
    max_size_history: Vec<u32>,
    desired_capacity_history: Vec<u32>,
    suspend_calls: Vec<Vec<String>>,
    resume_calls: Vec<Vec<String>>,
    resume_all_calls: u32,
    terminations: Vec<TerminationCall>,
    deregistrations: Vec<(String, String)>,
    mutations: u32,
}

struct State {
    fleets: HashMap<String, Fleet>,
    details: HashMap<String, InstanceDetail>,
    load_balancers: HashMap<String, Source>,
    target_groups: HashMap<String, Source>,
    launch_seq: u32,
    launch_delay: u32,
    register_delay: u32,
    drain_delay: u32,
    failing: BTreeSet<String>,
    log: CallLog,
}

/// In-memory `CloudApi` implementation.
pub struct FakeCloud {
    inner: Mutex<State>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State {
                fleets: HashMap::new(),
                details: HashMap::new(),
                load_balancers: HashMap::new(),
                target_groups: HashMap::new(),
                launch_seq: 0,
                launch_delay: 2,
                register_delay: 1,
                drain_delay: 1,
                failing: BTreeSet::new(),
                log: CallLog::default(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().expect("fake cloud state poisoned")
    }

    /// Install a fleet, its seeded members (healthy, already
    /// in-service on every attached source), and their details.
    pub fn seed_fleet(&self, seed: FleetSeed) {
        let mut state = self.state();
        for lb in &seed.load_balancers {
            state.load_balancers.entry(lb.clone()).or_default();
        }
        for tg in &seed.target_groups {
            state.target_groups.entry(tg.clone()).or_default();
        }
        for (n, (id, _)) in seed.members.iter().enumerate() {
            state.details.insert(
                id.clone(),
                InstanceDetail {
                    instance_id: id.clone(),
                    private_ip: format!("10.0.0.{}", n + 1),
                    public_ip: None,
                },
            );
            for lb in &seed.load_balancers {
                if let Some(src) = state.load_balancers.get_mut(lb) {
                    src.register(id, 0);
                }
            }
            for tg in &seed.target_groups {
                if let Some(src) = state.target_groups.get_mut(tg) {
                    src.register(id, 0);
                }
            }
        }
        let fleet = Fleet {
            desired: seed.desired,
            max: seed.max,
            launch_config: seed.launch_config,
            suspended: seed.suspended.into_iter().collect(),
            members: seed
                .members
                .into_iter()
                .map(|(id, launch_config)| Member {
                    id,
                    launch_config,
                    launch_countdown: 0,
                })
                .collect(),
            load_balancers: seed.load_balancers,
            target_groups: seed.target_groups,
        };
        state.fleets.insert(seed.name, fleet);
    }

    /// Configure propagation delays, all counted in describe calls:
    /// polls before a launch becomes visible, before a registration
    /// reports in-service, and before a draining instance drops out.
    pub fn set_delays(&self, launch: u32, register: u32, drain: u32) {
        let mut state = self.state();
        state.launch_delay = launch;
        state.register_delay = register;
        state.drain_delay = drain;
    }

    /// Give an instance a public address.
    pub fn set_public_ip(&self, instance_id: &str, ip: &str) {
        if let Some(detail) = self.state().details.get_mut(instance_id) {
            detail.public_ip = Some(ip.to_string());
        }
    }

    /// Make a mutation kind fail with a transient error from now on.
    pub fn fail_op(&self, op: FakeOp) {
        self.state().failing.insert(format!("{op:?}"));
    }

    fn check_failure(state: &mut State, op: FakeOp) -> RolloutResult<()> {
        if state.failing.contains(&format!("{op:?}")) {
            return Err(RolloutError::Transient(format!("injected failure: {op:?}")));
        }
        Ok(())
    }

    /// Advance launches and start replacements, then snapshot.
    fn describe_and_tick_fleet(state: &mut State, name: &str) -> RolloutResult<FleetDescriptor> {
        let launch_delay = state.launch_delay;
        let register_delay = state.register_delay;
        let mut seq = state.launch_seq;

        let fleet = state
            .fleets
            .get_mut(name)
            .ok_or_else(|| RolloutError::NotFound(format!("no fleet named `{name}`")))?;

        let mut became_visible = Vec::new();
        for member in &mut fleet.members {
            if member.launch_countdown > 0 {
                member.launch_countdown -= 1;
                if member.launch_countdown == 0 {
                    became_visible.push(member.id.clone());
                }
            }
        }

        // Launch replacements while membership trails desired capacity.
        let mut launched = Vec::new();
        while (fleet.members.len() as u32) < fleet.desired {
            seq += 1;
            let id = format!("i-new-{seq}");
            fleet.members.push(Member {
                id: id.clone(),
                launch_config: fleet.launch_config.clone(),
                launch_countdown: launch_delay.max(1),
            });
            launched.push((
                id.clone(),
                InstanceDetail {
                    instance_id: id,
                    private_ip: format!("10.0.9.{seq}"),
                    public_ip: None,
                },
            ));
        }

        let descriptor = FleetDescriptor {
            name: name.to_string(),
            desired_capacity: fleet.desired,
            max_size: fleet.max,
            load_balancer_names: fleet.load_balancers.clone(),
            target_group_arns: fleet.target_groups.clone(),
            suspended_processes: fleet.suspended.iter().cloned().collect(),
            launch_config: fleet.launch_config.clone(),
            members: fleet
                .members
                .iter()
                .filter(|m| m.launch_countdown == 0)
                .map(|m| InstanceRef {
                    instance_id: m.id.clone(),
                    health: HealthState::Healthy,
                    launch_config: m.launch_config.clone(),
                })
                .collect(),
        };

        // Newly visible members register with every attached source.
        let lbs = fleet.load_balancers.clone();
        let tgs = fleet.target_groups.clone();
        for id in &became_visible {
            for lb in &lbs {
                if let Some(src) = state.load_balancers.get_mut(lb) {
                    src.register(id, register_delay);
                }
            }
            for tg in &tgs {
                if let Some(src) = state.target_groups.get_mut(tg) {
                    src.register(id, register_delay);
                }
            }
        }
        for (id, detail) in launched {
            state.details.insert(id, detail);
        }
        state.launch_seq = seq;

        Ok(descriptor)
    }

    // ── Test inspection ───────────────────────────────────────────

    pub fn terminations(&self) -> Vec<TerminationCall> {
        self.state().log.terminations.clone()
    }

    pub fn max_size_history(&self) -> Vec<u32> {
        self.state().log.max_size_history.clone()
    }

    pub fn desired_capacity_history(&self) -> Vec<u32> {
        self.state().log.desired_capacity_history.clone()
    }

    pub fn suspend_calls(&self) -> Vec<Vec<String>> {
        self.state().log.suspend_calls.clone()
    }

    pub fn resume_calls(&self) -> Vec<Vec<String>> {
        self.state().log.resume_calls.clone()
    }

    pub fn resume_all_calls(&self) -> u32 {
        self.state().log.resume_all_calls
    }

    pub fn deregistrations(&self) -> Vec<(String, String)> {
        self.state().log.deregistrations.clone()
    }

    /// Total mutation calls of any kind.
    pub fn mutation_count(&self) -> u32 {
        self.state().log.mutations
    }

    pub fn current_desired(&self, fleet: &str) -> Option<u32> {
        self.state().fleets.get(fleet).map(|f| f.desired)
    }

    pub fn current_max_size(&self, fleet: &str) -> Option<u32> {
        self.state().fleets.get(fleet).map(|f| f.max)
    }

    pub fn current_suspended(&self, fleet: &str) -> Vec<String> {
        self.state()
            .fleets
            .get(fleet)
            .map(|f| f.suspended.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn current_member_ids(&self, fleet: &str) -> Vec<String> {
        self.state()
            .fleets
            .get(fleet)
            .map(|f| f.members.iter().map(|m| m.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn source_present_ids(&self, lb_or_tg: &str) -> Vec<String> {
        let state = self.state();
        state
            .load_balancers
            .get(lb_or_tg)
            .or_else(|| state.target_groups.get(lb_or_tg))
            .map(|s| s.present_ids())
            .unwrap_or_default()
    }

    /// Force an id in-service on a source immediately (test setup).
    pub fn force_in_service(&self, source: &str, instance_id: &str) {
        let mut state = self.state();
        if state.load_balancers.contains_key(source) {
            if let Some(src) = state.load_balancers.get_mut(source) {
                src.register(instance_id, 0);
            }
        } else if let Some(src) = state.target_groups.get_mut(source) {
            src.register(instance_id, 0);
        }
    }
}

impl CloudApi for FakeCloud {
    async fn describe_fleet(&self, name: &str) -> RolloutResult<FleetDescriptor> {
        let mut state = self.state();
        Self::describe_and_tick_fleet(&mut state, name)
    }

    async fn describe_instance(&self, instance_id: &str) -> RolloutResult<InstanceDetail> {
        self.state()
            .details
            .get(instance_id)
            .cloned()
            .ok_or_else(|| RolloutError::NotFound(format!("no instance `{instance_id}`")))
    }

    async fn load_balancer_instance_ids(&self, lb_name: &str) -> RolloutResult<Vec<String>> {
        let mut state = self.state();
        let src = state
            .load_balancers
            .get_mut(lb_name)
            .ok_or_else(|| RolloutError::NotFound(format!("no load balancer `{lb_name}`")))?;
        src.tick();
        Ok(src.present_ids())
    }

    async fn load_balancer_in_service_ids(&self, lb_name: &str) -> RolloutResult<Vec<String>> {
        let mut state = self.state();
        let src = state
            .load_balancers
            .get_mut(lb_name)
            .ok_or_else(|| RolloutError::NotFound(format!("no load balancer `{lb_name}`")))?;
        src.tick();
        Ok(src.in_service_ids())
    }

    async fn target_group_instance_ids(&self, tg_arn: &str) -> RolloutResult<Vec<String>> {
        let mut state = self.state();
        let src = state
            .target_groups
            .get_mut(tg_arn)
            .ok_or_else(|| RolloutError::NotFound(format!("no target group `{tg_arn}`")))?;
        src.tick();
        Ok(src.present_ids())
    }

    async fn target_group_healthy_ids(&self, tg_arn: &str) -> RolloutResult<Vec<String>> {
        let mut state = self.state();
        let src = state
            .target_groups
            .get_mut(tg_arn)
            .ok_or_else(|| RolloutError::NotFound(format!("no target group `{tg_arn}`")))?;
        src.tick();
        Ok(src.in_service_ids())
    }

    async fn update_max_size(&self, fleet: &str, max_size: u32) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::UpdateMaxSize)?;
        let f = state
            .fleets
            .get_mut(fleet)
            .ok_or_else(|| RolloutError::NotFound(format!("no fleet named `{fleet}`")))?;
        f.max = max_size;
        state.log.max_size_history.push(max_size);
        Ok(())
    }

    async fn set_desired_capacity(&self, fleet: &str, desired: u32) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::SetDesiredCapacity)?;
        let f = state
            .fleets
            .get_mut(fleet)
            .ok_or_else(|| RolloutError::NotFound(format!("no fleet named `{fleet}`")))?;
        f.desired = desired;
        state.log.desired_capacity_history.push(desired);
        Ok(())
    }

    async fn suspend_processes(
        &self,
        fleet: &str,
        processes: &[ScalingProcess],
    ) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::SuspendProcesses)?;
        let names: Vec<String> = processes.iter().map(|p| p.as_str().to_string()).collect();
        let f = state
            .fleets
            .get_mut(fleet)
            .ok_or_else(|| RolloutError::NotFound(format!("no fleet named `{fleet}`")))?;
        for name in &names {
            f.suspended.insert(name.clone());
        }
        state.log.suspend_calls.push(names);
        Ok(())
    }

    async fn resume_processes(
        &self,
        fleet: &str,
        processes: &[ScalingProcess],
    ) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::ResumeProcesses)?;
        let names: Vec<String> = processes.iter().map(|p| p.as_str().to_string()).collect();
        let f = state
            .fleets
            .get_mut(fleet)
            .ok_or_else(|| RolloutError::NotFound(format!("no fleet named `{fleet}`")))?;
        for name in &names {
            f.suspended.remove(name);
        }
        state.log.resume_calls.push(names);
        Ok(())
    }

    async fn resume_all_processes(&self, fleet: &str) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::ResumeProcesses)?;
        let f = state
            .fleets
            .get_mut(fleet)
            .ok_or_else(|| RolloutError::NotFound(format!("no fleet named `{fleet}`")))?;
        f.suspended.clear();
        state.log.resume_all_calls += 1;
        Ok(())
    }

    async fn terminate_instance(
        &self,
        instance_id: &str,
        decrement_desired_capacity: bool,
    ) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::TerminateInstance)?;
        let drain = state.drain_delay;

        let fleet = state
            .fleets
            .values_mut()
            .find(|f| f.members.iter().any(|m| m.id == instance_id))
            .ok_or_else(|| {
                RolloutError::NotFound(format!("no fleet member `{instance_id}`"))
            })?;
        fleet.members.retain(|m| m.id != instance_id);
        if decrement_desired_capacity {
            fleet.desired = fleet.desired.saturating_sub(1);
        }
        let lbs = fleet.load_balancers.clone();
        let tgs = fleet.target_groups.clone();

        // A terminated instance drains out of any source it is still
        // listed in, whether or not it was deregistered first.
        for lb in &lbs {
            if let Some(src) = state.load_balancers.get_mut(lb) {
                src.deregister(instance_id, drain);
            }
        }
        for tg in &tgs {
            if let Some(src) = state.target_groups.get_mut(tg) {
                src.deregister(instance_id, drain);
            }
        }

        state.details.remove(instance_id);
        state.log.terminations.push(TerminationCall {
            instance_id: instance_id.to_string(),
            decrement: decrement_desired_capacity,
        });
        Ok(())
    }

    async fn deregister_from_load_balancer(
        &self,
        instance_id: &str,
        lb_name: &str,
    ) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::DeregisterLoadBalancer)?;
        let drain = state.drain_delay;
        let src = state
            .load_balancers
            .get_mut(lb_name)
            .ok_or_else(|| RolloutError::NotFound(format!("no load balancer `{lb_name}`")))?;
        src.deregister(instance_id, drain);
        state
            .log
            .deregistrations
            .push((instance_id.to_string(), lb_name.to_string()));
        Ok(())
    }

    async fn deregister_from_target_group(
        &self,
        instance_id: &str,
        tg_arn: &str,
    ) -> RolloutResult<()> {
        let mut state = self.state();
        state.log.mutations += 1;
        Self::check_failure(&mut state, FakeOp::DeregisterTargetGroup)?;
        let drain = state.drain_delay;
        let src = state
            .target_groups
            .get_mut(tg_arn)
            .ok_or_else(|| RolloutError::NotFound(format!("no target group `{tg_arn}`")))?;
        src.deregister(instance_id, drain);
        state
            .log
            .deregistrations
            .push((instance_id.to_string(), tg_arn.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_member_fleet() -> FakeCloud {
        let cloud = FakeCloud::new();
        cloud.seed_fleet(FleetSeed::new("web", 2, 2).member("i-a").member("i-b"));
        cloud
    }

    #[tokio::test]
    async fn missing_fleet_is_not_found() {
        let cloud = FakeCloud::new();
        match cloud.describe_fleet("nope").await {
            Err(RolloutError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn seeded_members_are_healthy_and_visible() {
        let cloud = two_member_fleet();
        let fleet = cloud.describe_fleet("web").await.unwrap();
        assert_eq!(fleet.healthy_count(), 2);
        assert_eq!(fleet.desired_capacity, 2);
    }

    #[tokio::test]
    async fn raising_desired_launches_after_delay() {
        let cloud = two_member_fleet();
        cloud.set_delays(2, 1, 1);
        cloud.set_desired_capacity("web", 3).await.unwrap();

        // Launch starts on the first describe, becomes visible two
        // describes later.
        let fleet = cloud.describe_fleet("web").await.unwrap();
        assert_eq!(fleet.healthy_count(), 2);
        let fleet = cloud.describe_fleet("web").await.unwrap();
        assert_eq!(fleet.healthy_count(), 2);
        let fleet = cloud.describe_fleet("web").await.unwrap();
        assert_eq!(fleet.healthy_count(), 3);
        assert!(fleet
            .members
            .iter()
            .any(|m| m.instance_id.starts_with("i-new-")));
    }

    #[tokio::test]
    async fn new_member_registers_with_sources_then_goes_in_service() {
        let cloud = FakeCloud::new();
        cloud.seed_fleet(
            FleetSeed::new("web", 1, 2)
                .member("i-a")
                .load_balancer("lb-1"),
        );
        cloud.set_delays(1, 3, 1);
        cloud.set_desired_capacity("web", 2).await.unwrap();

        // Launch and make visible.
        cloud.describe_fleet("web").await.unwrap();
        let fleet = cloud.describe_fleet("web").await.unwrap();
        assert_eq!(fleet.healthy_count(), 2);

        // Present immediately, in-service after three source polls.
        let present = cloud.load_balancer_instance_ids("lb-1").await.unwrap();
        assert_eq!(present.len(), 2);
        let in_service = cloud.load_balancer_in_service_ids("lb-1").await.unwrap();
        assert_eq!(in_service, vec!["i-a".to_string()]);
        let in_service = cloud.load_balancer_in_service_ids("lb-1").await.unwrap();
        assert_eq!(in_service.len(), 2);
    }

    #[tokio::test]
    async fn deregistered_instance_drains_then_disappears() {
        let cloud = FakeCloud::new();
        cloud.seed_fleet(
            FleetSeed::new("web", 1, 1)
                .member("i-a")
                .target_group("tg-1"),
        );
        cloud.set_delays(1, 0, 2);

        cloud
            .deregister_from_target_group("i-a", "tg-1")
            .await
            .unwrap();

        // Draining: present but not healthy.
        assert_eq!(
            cloud.target_group_instance_ids("tg-1").await.unwrap(),
            vec!["i-a".to_string()]
        );
        assert!(cloud.target_group_healthy_ids("tg-1").await.unwrap().is_empty());

        // Drain countdown expires.
        assert!(cloud.target_group_instance_ids("tg-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn terminate_with_decrement_lowers_desired() {
        let cloud = two_member_fleet();
        cloud.terminate_instance("i-a", true).await.unwrap();
        assert_eq!(cloud.current_desired("web"), Some(1));
        assert_eq!(
            cloud.terminations(),
            vec![TerminationCall {
                instance_id: "i-a".to_string(),
                decrement: true,
            }]
        );
        match cloud.describe_instance("i-a").await {
            Err(RolloutError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn injected_failure_is_transient() {
        let cloud = two_member_fleet();
        cloud.fail_op(FakeOp::UpdateMaxSize);
        match cloud.update_max_size("web", 5).await {
            Err(RolloutError::Transient(_)) => {}
            other => panic!("expected Transient, got {other:?}"),
        }
    }
}
