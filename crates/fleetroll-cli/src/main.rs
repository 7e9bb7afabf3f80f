//! fleetroll — zero-downtime rolling replacement of an autoscaling
//! group's instances.
//!
//! Replaces every member of a fleet one at a time: a fresh instance
//! launches and goes in service on every attached load balancer and
//! target group before the old one is drained and terminated. The
//! fleet's max size, desired capacity, and suspended processes are put
//! back where they started.
//!
//! # Usage
//!
//! ```text
//! fleetroll --group my-asg
//! fleetroll --group my-asg --up-check-command 'curl -fs http://NEW_INSTANCE_PRIVATE_IP_ADDRESS/health'
//! ```

use std::time::Duration;

use clap::Parser;
use tracing::error;

use fleetroll_cloud::AwsCloud;
use fleetroll_core::RolloutOptions;
use fleetroll_rollout::RolloutEngine;

#[derive(Parser)]
#[command(
    name = "fleetroll",
    about = "Gracefully replace every instance in an autoscaling group",
    version
)]
struct Cli {
    /// Autoscaling group to roll.
    #[arg(short, long)]
    group: String,

    /// Skip process-state checks and drain verification, and resume
    /// all suspended processes unconditionally. May cause downtime.
    #[arg(short, long)]
    force: bool,

    /// Skip load-balancer and target-group health checks as
    /// replacements come up. May cause downtime.
    #[arg(short, long)]
    skip_traffic_check: bool,

    /// Extra seconds to wait between draining an instance and
    /// terminating it.
    #[arg(short, long, default_value = "0", value_name = "SECONDS")]
    wait_for_seconds: u64,

    /// Shell command run against each new instance; the rollout blocks
    /// until it exits 0. Placeholders NEW_INSTANCE_ID,
    /// NEW_INSTANCE_PRIVATE_IP_ADDRESS, and
    /// NEW_INSTANCE_PUBLIC_IP_ADDRESS are substituted.
    #[arg(short, long, value_name = "COMMAND")]
    up_check_command: Option<String>,

    /// Shell command run before each old instance terminates.
    /// Placeholders OLD_INSTANCE_ID, OLD_INSTANCE_PRIVATE_IP_ADDRESS,
    /// and OLD_INSTANCE_PUBLIC_IP_ADDRESS are substituted. Non-zero
    /// exit is a warning, not an abort.
    #[arg(short = 'b', long, value_name = "COMMAND")]
    pre_down_command: Option<String>,

    /// Shell command run after each old instance terminates, with the
    /// same placeholders as --pre-down-command.
    #[arg(short = 'd', long, value_name = "COMMAND")]
    post_down_command: Option<String>,

    /// Leave instances already running the group's current launch
    /// configuration or template in place.
    #[arg(short = 'c', long)]
    skip_already_updated: bool,
}

impl Cli {
    fn into_options(self) -> RolloutOptions {
        let mut options = RolloutOptions::for_fleet(self.group);
        options.force = self.force;
        options.skip_traffic_check = self.skip_traffic_check;
        options.extra_wait = Duration::from_secs(self.wait_for_seconds);
        options.up_check_command = self.up_check_command;
        options.pre_down_command = self.pre_down_command;
        options.post_down_command = self.post_down_command;
        options.skip_already_updated = self.skip_already_updated;
        options
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetroll=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let options = cli.into_options();

    let cloud = AwsCloud::load().await;
    let engine = RolloutEngine::new(&cloud, options);

    match engine.run().await {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "rollout aborted");
            std::process::exit(1);
        }
    }
}
