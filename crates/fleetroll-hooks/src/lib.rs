//! External hook invocation.
//!
//! User-supplied shell commands run at three points: verifying a new
//! instance is up, before a retiree terminates, and after. The command
//! string carries placeholder tokens that are literally substituted
//! per instance before the command runs through the shell. Exit code 0
//! means success; what any other code means is the caller's policy
//! (the up-check blocks and retries, the down hooks only warn).

use std::process::Stdio;

use tracing::{info, warn};

use fleetroll_core::types::InstanceDetail;
use fleetroll_core::{RolloutError, RolloutResult};

/// Placeholder tokens substituted into up-check commands.
pub const NEW_INSTANCE_ID: &str = "NEW_INSTANCE_ID";
pub const NEW_INSTANCE_PRIVATE_IP: &str = "NEW_INSTANCE_PRIVATE_IP_ADDRESS";
pub const NEW_INSTANCE_PUBLIC_IP: &str = "NEW_INSTANCE_PUBLIC_IP_ADDRESS";

/// Placeholder tokens substituted into pre/post-down commands.
pub const OLD_INSTANCE_ID: &str = "OLD_INSTANCE_ID";
pub const OLD_INSTANCE_PRIVATE_IP: &str = "OLD_INSTANCE_PRIVATE_IP_ADDRESS";
pub const OLD_INSTANCE_PUBLIC_IP: &str = "OLD_INSTANCE_PUBLIC_IP_ADDRESS";

/// A placeholder → value table applied to a command template.
///
/// Substitution is literal substring replacement. A placeholder with
/// no value (an instance without a public address) is left untouched
/// in the rendered command.
#[derive(Debug, Default, Clone)]
pub struct SubstitutionTable {
    entries: Vec<(&'static str, String)>,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder to a value.
    pub fn set(mut self, placeholder: &'static str, value: impl Into<String>) -> Self {
        self.entries.push((placeholder, value.into()));
        self
    }

    /// Bind a placeholder only when a value exists.
    pub fn set_opt(self, placeholder: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.set(placeholder, v),
            None => self,
        }
    }

    /// Bindings for a freshly launched instance (up-check).
    pub fn for_new_instance(detail: &InstanceDetail) -> Self {
        Self::new()
            .set(NEW_INSTANCE_ID, &detail.instance_id)
            .set(NEW_INSTANCE_PRIVATE_IP, &detail.private_ip)
            .set_opt(NEW_INSTANCE_PUBLIC_IP, detail.public_ip.as_deref())
    }

    /// Bindings for an instance about to go down (pre/post-down).
    pub fn for_old_instance(detail: &InstanceDetail) -> Self {
        Self::new()
            .set(OLD_INSTANCE_ID, &detail.instance_id)
            .set(OLD_INSTANCE_PRIVATE_IP, &detail.private_ip)
            .set_opt(OLD_INSTANCE_PUBLIC_IP, detail.public_ip.as_deref())
    }

    /// Render the template with every bound placeholder substituted.
    pub fn apply(&self, template: &str) -> String {
        let mut rendered = template.to_string();
        for (placeholder, value) in &self.entries {
            rendered = rendered.replace(placeholder, value);
        }
        rendered
    }
}

/// Run a rendered command through the shell and report whether it
/// exited 0. Failure to spawn the shell at all is a `Hook` error.
pub async fn invoke(command: &str) -> RolloutResult<bool> {
    info!(command, "executing external hook");
    let status = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| RolloutError::Hook(format!("unable to run `{command}`: {e}")))?;

    let code = status.code().unwrap_or(-1);
    if code != 0 {
        warn!(command, code, "hook exited non-zero");
    }
    Ok(code == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(public: Option<&str>) -> InstanceDetail {
        InstanceDetail {
            instance_id: "i-123".to_string(),
            private_ip: "10.0.0.7".to_string(),
            public_ip: public.map(|s| s.to_string()),
        }
    }

    #[test]
    fn substitutes_all_new_instance_placeholders() {
        let table = SubstitutionTable::for_new_instance(&detail(Some("54.1.2.3")));
        let rendered = table.apply(
            "curl -f http://NEW_INSTANCE_PRIVATE_IP_ADDRESS/health # NEW_INSTANCE_ID via NEW_INSTANCE_PUBLIC_IP_ADDRESS",
        );
        assert_eq!(
            rendered,
            "curl -f http://10.0.0.7/health # i-123 via 54.1.2.3"
        );
    }

    #[test]
    fn missing_public_ip_leaves_placeholder_untouched() {
        let table = SubstitutionTable::for_new_instance(&detail(None));
        let rendered = table.apply("ping NEW_INSTANCE_PUBLIC_IP_ADDRESS");
        assert_eq!(rendered, "ping NEW_INSTANCE_PUBLIC_IP_ADDRESS");
    }

    #[test]
    fn old_instance_placeholders() {
        let table = SubstitutionTable::for_old_instance(&detail(None));
        let rendered = table.apply("consul force-leave OLD_INSTANCE_ID OLD_INSTANCE_PRIVATE_IP_ADDRESS");
        assert_eq!(rendered, "consul force-leave i-123 10.0.0.7");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let table = SubstitutionTable::for_new_instance(&detail(None));
        assert_eq!(table.apply("echo hello"), "echo hello");
    }

    #[tokio::test]
    async fn invoke_reports_exit_status() {
        assert!(invoke("true").await.unwrap());
        assert!(!invoke("false").await.unwrap());
        assert!(!invoke("exit 7").await.unwrap());
    }

    #[tokio::test]
    async fn invoke_runs_through_a_shell() {
        assert!(invoke("test 1 -eq 1 && true").await.unwrap());
    }
}
