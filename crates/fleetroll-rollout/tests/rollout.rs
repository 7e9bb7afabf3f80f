//! End-to-end rollout runs against the in-memory control plane.

use std::time::Duration;

use fleetroll_cloud::{FakeCloud, FleetSeed, TerminationCall};
use fleetroll_core::{PollIntervals, RolloutError, RolloutOptions};
use fleetroll_rollout::RolloutEngine;

fn terminated(id: &str, decrement: bool) -> TerminationCall {
    TerminationCall {
        instance_id: id.to_string(),
        decrement,
    }
}

/// Intervals short enough for wall-clock tests with real hooks.
fn quick_intervals() -> PollIntervals {
    PollIntervals {
        settle: Duration::from_millis(10),
        capacity: Duration::from_millis(10),
        traffic: Duration::from_millis(10),
        snapshot: Duration::from_millis(10),
    }
}

#[tokio::test(start_paused = true)]
async fn replaces_every_member_and_restores_the_fleet() {
    let cloud = FakeCloud::new();
    cloud.seed_fleet(
        FleetSeed::new("web", 2, 2)
            .member("i-a")
            .member("i-b")
            .load_balancer("lb-1"),
    );
    cloud.set_delays(1, 0, 1);

    let mut options = RolloutOptions::for_fleet("web");
    options.extra_wait = Duration::from_secs(30);
    let summary = RolloutEngine::new(&cloud, options).run().await.unwrap();

    assert_eq!(summary.retired, vec!["i-a".to_string(), "i-b".to_string()]);
    assert_eq!(summary.skipped_already_updated, 0);

    // Only the last termination decrements desired capacity.
    assert_eq!(
        cloud.terminations(),
        vec![terminated("i-a", false), terminated("i-b", true)]
    );

    // Headroom bumped once and restored; desired bumped exactly once.
    assert_eq!(cloud.max_size_history(), vec![3, 2]);
    assert_eq!(cloud.desired_capacity_history(), vec![3]);
    assert_eq!(cloud.current_desired("web"), Some(2));
    assert_eq!(cloud.current_max_size("web"), Some(2));

    // Ancillary processes suspended for the run and resumed after.
    assert_eq!(cloud.suspend_calls().len(), 1);
    assert_eq!(cloud.suspend_calls()[0].len(), 3);
    assert_eq!(cloud.resume_calls().len(), 1);
    assert!(cloud.current_suspended("web").is_empty());

    // The fleet ends up on fresh instances only.
    let members = cloud.current_member_ids("web");
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|id| id.starts_with("i-new-")));
}

#[tokio::test(start_paused = true)]
async fn missing_fleet_aborts_without_mutations() {
    let cloud = FakeCloud::new();
    let result = RolloutEngine::new(&cloud, RolloutOptions::for_fleet("ghost"))
        .run()
        .await;
    assert!(matches!(result, Err(RolloutError::Fatal(_))));
    assert_eq!(cloud.mutation_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn suspended_required_process_aborts_before_any_mutation() {
    let cloud = FakeCloud::new();
    cloud.seed_fleet(FleetSeed::new("web", 1, 2).member("i-a").suspended("Launch"));

    let result = RolloutEngine::new(&cloud, RolloutOptions::for_fleet("web"))
        .run()
        .await;
    assert!(matches!(result, Err(RolloutError::Fatal(_))));
    assert!(cloud.terminations().is_empty());
    assert_eq!(cloud.mutation_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn three_members_roll_one_at_a_time() {
    let cloud = FakeCloud::new();
    cloud.seed_fleet(
        FleetSeed::new("api", 3, 5)
            .member("i-a")
            .member("i-b")
            .member("i-c"),
    );
    cloud.set_delays(1, 0, 1);

    let summary = RolloutEngine::new(&cloud, RolloutOptions::for_fleet("api"))
        .run()
        .await
        .unwrap();
    assert_eq!(summary.retired.len(), 3);

    assert_eq!(
        cloud.terminations(),
        vec![
            terminated("i-a", false),
            terminated("i-b", false),
            terminated("i-c", true),
        ]
    );
    // Capacity went up by exactly one, never by the retiree count,
    // and max size was never touched (headroom already existed).
    assert_eq!(cloud.desired_capacity_history(), vec![4]);
    assert!(cloud.max_size_history().is_empty());
    assert_eq!(cloud.current_desired("api"), Some(3));
    assert_eq!(cloud.current_member_ids("api").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn skip_already_updated_with_nothing_to_do_restores_capacity() {
    let cloud = FakeCloud::new();
    cloud.seed_fleet(
        FleetSeed::new("web", 2, 2)
            .member_with_config("i-a", "lc-current")
            .member_with_config("i-b", "lc-current"),
    );
    cloud.set_delays(1, 0, 1);

    let mut options = RolloutOptions::for_fleet("web");
    options.skip_already_updated = true;
    let summary = RolloutEngine::new(&cloud, options).run().await.unwrap();

    assert!(summary.retired.is_empty());
    assert_eq!(summary.skipped_already_updated, 2);
    assert!(cloud.terminations().is_empty());

    // No termination decremented, so desired capacity is restored
    // explicitly; max size round-trips as usual.
    assert_eq!(cloud.desired_capacity_history(), vec![2]);
    assert_eq!(cloud.max_size_history(), vec![3, 2]);
    assert_eq!(cloud.current_member_ids("web").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn force_resumes_everything_and_rolls_a_suspended_fleet() {
    let cloud = FakeCloud::new();
    cloud.seed_fleet(FleetSeed::new("web", 1, 2).member("i-a").suspended("Launch"));
    cloud.set_delays(1, 0, 1);

    let mut options = RolloutOptions::for_fleet("web");
    options.force = true;
    let summary = RolloutEngine::new(&cloud, options).run().await.unwrap();

    assert_eq!(summary.retired, vec!["i-a".to_string()]);
    assert_eq!(cloud.terminations(), vec![terminated("i-a", true)]);
    // Once up front instead of the process-state check, once at the end.
    assert_eq!(cloud.resume_all_calls(), 2);
    assert!(cloud.current_suspended("web").is_empty());
    assert_eq!(cloud.current_desired("web"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn retiree_drains_from_every_attached_source() {
    let cloud = FakeCloud::new();
    cloud.seed_fleet(
        FleetSeed::new("web", 1, 1)
            .member("i-a")
            .load_balancer("lb-1")
            .target_group("tg-1"),
    );
    cloud.set_delays(1, 0, 2);

    let summary = RolloutEngine::new(&cloud, RolloutOptions::for_fleet("web"))
        .run()
        .await
        .unwrap();
    assert_eq!(summary.retired, vec!["i-a".to_string()]);

    // Deregistered from both sources before termination.
    assert_eq!(
        cloud.deregistrations(),
        vec![
            ("i-a".to_string(), "lb-1".to_string()),
            ("i-a".to_string(), "tg-1".to_string()),
        ]
    );
    // The retiree is fully gone; only the replacement remains.
    assert_eq!(cloud.source_present_ids("lb-1"), vec!["i-new-1".to_string()]);
    assert_eq!(cloud.source_present_ids("tg-1"), vec!["i-new-1".to_string()]);

    assert_eq!(cloud.terminations(), vec![terminated("i-a", true)]);
    assert_eq!(cloud.max_size_history(), vec![2, 1]);
    assert_eq!(cloud.desired_capacity_history(), vec![2]);
}

#[tokio::test]
async fn hooks_run_with_instance_placeholders_substituted() {
    let dir = tempfile::tempdir().unwrap();
    let flag = dir.path().join("passed-once");
    let ups = dir.path().join("ups");
    let downs = dir.path().join("downs");
    let posts = dir.path().join("posts");

    let cloud = FakeCloud::new();
    cloud.seed_fleet(FleetSeed::new("web", 1, 2).member("i-a"));
    cloud.set_delays(1, 0, 1);

    let mut options = RolloutOptions::for_fleet("web");
    options.intervals = quick_intervals();
    // Fails on first invocation, passes on the retry.
    options.up_check_command = Some(format!(
        "if [ -f {flag} ]; then echo NEW_INSTANCE_ID >> {ups}; else touch {flag}; exit 1; fi",
        flag = flag.display(),
        ups = ups.display(),
    ));
    options.pre_down_command = Some(format!(
        "echo OLD_INSTANCE_ID OLD_INSTANCE_PRIVATE_IP_ADDRESS >> {}",
        downs.display()
    ));
    // Non-zero exit must not abort the rollout.
    options.post_down_command = Some(format!("echo OLD_INSTANCE_ID >> {}; exit 3", posts.display()));

    let summary = RolloutEngine::new(&cloud, options).run().await.unwrap();
    assert_eq!(summary.retired, vec!["i-a".to_string()]);

    let ups = std::fs::read_to_string(&ups).unwrap();
    assert_eq!(ups.trim(), "i-new-1");

    let downs = std::fs::read_to_string(&downs).unwrap();
    assert_eq!(downs.trim(), "i-a 10.0.0.1");

    let posts = std::fs::read_to_string(&posts).unwrap();
    assert_eq!(posts.trim(), "i-a");
}
