//! Pre-flight privilege check
//!
//! Provisioning installs packages, creates system users and writes under
//! `/etc` and `/var/www`, so the run refuses to start without root. This is the
//! only fatal check: it happens before any step runs and leaves no state.

use crate::runner::HostProbe;

/// Environment variable that bypasses the root check (development only).
pub const SKIP_ROOT_CHECK_ENV: &str = "PTERO_INSTALL_SKIP_ROOT_CHECK";

/// Result of environment verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreflightResult {
    pub is_root: bool,
}

impl PreflightResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.is_root
    }
}

/// Check if running as root (EUID 0)
pub fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Skip root check (for development/testing)
/// Set PTERO_INSTALL_SKIP_ROOT_CHECK=1 to skip
pub fn should_skip_root_check() -> bool {
    let skip = std::env::var(SKIP_ROOT_CHECK_ENV)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);
    if skip {
        tracing::warn!("Root check skipped ({}=1)", SKIP_ROOT_CHECK_ENV);
    }
    skip
}

/// Perform the pre-flight checks against a host probe
pub fn verify_environment(probe: &dyn HostProbe) -> PreflightResult {
    PreflightResult {
        is_root: probe.is_privileged(),
    }
}

/// Print a pretty error message to stderr
pub fn print_preflight_failure(result: &PreflightResult) {
    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║              ptero-install - Pre-flight Check Failed             ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    if !result.is_root {
        eprintln!("✗ ERROR: Root privileges required");
        eprintln!("   This installer creates system users, installs packages and");
        eprintln!("   writes service configuration.");
        eprintln!();
        eprintln!("   Solution: Run as root: sudo su -");
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProbe(bool);

    impl HostProbe for StubProbe {
        fn has_command(&self, _name: &str) -> bool {
            false
        }
        fn user_exists(&self, _name: &str) -> bool {
            false
        }
        fn command_output(&self, _command: &str) -> Option<String> {
            None
        }
        fn is_privileged(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_preflight_result_is_ok() {
        assert!(PreflightResult { is_root: true }.is_ok());
        assert!(!PreflightResult { is_root: false }.is_ok());
    }

    #[test]
    fn test_verify_environment_uses_probe() {
        assert!(verify_environment(&StubProbe(true)).is_ok());
        assert!(!verify_environment(&StubProbe(false)).is_ok());
    }
}
