//! External command execution and host probes.
//!
//! `CommandRunner` is the only way a step touches the host: it runs a shell
//! command with inherited stdio (the operator sees package-manager output
//! live) and folds every failure into a `CommandOutcome` value. Nothing here
//! returns `Err` to the orchestrator, which is what lets a run continue past
//! failed actions.
//!
//! `HostProbe` answers the read-only questions idempotency guards ask:
//! is a tool on PATH, does an OS user exist, what does `php -v` print.

use std::process::{Command, Stdio};

use crate::ui;

/// Result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Whether the command exited with status 0.
    pub ok: bool,
    /// Human-readable reason when `ok` is false.
    pub error_message: Option<String>,
}

impl CommandOutcome {
    /// A successful outcome.
    pub fn success() -> Self {
        Self {
            ok: true,
            error_message: None,
        }
    }

    /// A failed outcome with a reason.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_message: Some(msg.into()),
        }
    }
}

/// Executes external commands on behalf of provisioning steps.
pub trait CommandRunner {
    /// Run `command` through the shell, announcing `description` first.
    ///
    /// Must never panic or propagate an error: spawn failures and non-zero
    /// exits are returned as a failed `CommandOutcome`.
    fn run(&self, command: &str, description: &str) -> CommandOutcome;
}

/// Read-only queries against the host.
pub trait HostProbe {
    /// Returns true if `name` resolves on PATH.
    fn has_command(&self, name: &str) -> bool;

    /// Returns true if the OS user `name` exists.
    fn user_exists(&self, name: &str) -> bool;

    /// Captured stdout of `command` if it exits successfully.
    fn command_output(&self, command: &str) -> Option<String>;

    /// Returns true if the process may perform privileged provisioning.
    fn is_privileged(&self) -> bool;
}

/// Runs commands on the real host through `bash -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ShellRunner {
    /// Create a new shell runner
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, description: &str) -> CommandOutcome {
        ui::step(description);
        tracing::info!(command, "{}", description);

        let status = Command::new("bash")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status();

        match status {
            Ok(status) if status.success() => {
                ui::ok(description);
                CommandOutcome::success()
            }
            Ok(status) => {
                let reason = match status.code() {
                    Some(code) => format!("{} failed (exit code {})", description, code),
                    None => format!("{} terminated by signal", description),
                };
                ui::fail(&reason);
                tracing::error!(command, "{}", reason);
                CommandOutcome::failure(reason)
            }
            Err(e) => {
                let reason = format!("{} could not be started: {}", description, e);
                ui::fail(&reason);
                tracing::error!(command, "{}", reason);
                CommandOutcome::failure(reason)
            }
        }
    }
}

/// Probes the real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    /// Create a new system probe
    pub fn new() -> Self {
        Self
    }
}

impl HostProbe for SystemProbe {
    fn has_command(&self, name: &str) -> bool {
        Command::new("which")
            .arg(name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn user_exists(&self, name: &str) -> bool {
        match nix::unistd::User::from_name(name) {
            Ok(user) => user.is_some(),
            Err(e) => {
                tracing::warn!("passwd lookup for {} failed: {}", name, e);
                false
            }
        }
    }

    fn command_output(&self, command: &str) -> Option<String> {
        let output = Command::new("bash")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;

        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            None
        }
    }

    fn is_privileged(&self) -> bool {
        crate::sanity::is_running_as_root() || crate::sanity::should_skip_root_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        assert!(CommandOutcome::success().ok);
        assert!(CommandOutcome::success().error_message.is_none());

        let failed = CommandOutcome::failure("apt-get update failed (exit code 100)");
        assert!(!failed.ok);
        assert_eq!(
            failed.error_message.as_deref(),
            Some("apt-get update failed (exit code 100)")
        );
    }

    #[test]
    fn test_shell_runner_success() {
        let outcome = ShellRunner::new().run("true", "No-op");
        assert!(outcome.ok);
    }

    #[test]
    fn test_shell_runner_failure_is_a_value() {
        let outcome = ShellRunner::new().run("exit 3", "Failing command");
        assert!(!outcome.ok);
        let msg = outcome.error_message.expect("failure message");
        assert!(msg.contains("Failing command"));
        assert!(msg.contains("exit code 3"));
    }

    #[test]
    fn test_probe_has_command() {
        let probe = SystemProbe::new();
        assert!(probe.has_command("bash"), "bash should be available");
        assert!(!probe.has_command("this_binary_definitely_does_not_exist_12345"));
    }

    #[test]
    fn test_probe_user_exists() {
        let probe = SystemProbe::new();
        assert!(probe.user_exists("root"));
        assert!(!probe.user_exists("no_such_user_ptero_12345"));
    }

    #[test]
    fn test_probe_command_output() {
        let probe = SystemProbe::new();
        assert_eq!(probe.command_output("echo 8.2.10").as_deref(), Some("8.2.10\n"));
        assert!(probe.command_output("exit 1").is_none());
    }
}
