//! Error handling module for the installer
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Component-specific errors (`StateError`, `RenderError`, `CredentialError`,
//! `RunTransitionError`) convert into `InstallError` at the orchestrator seam.

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::render::RenderError;
use crate::run_state::RunTransitionError;
use crate::state::{SecretKind, StateError};

/// Main error type for the installer
#[derive(Error, Debug)]
pub enum InstallError {
    /// IO errors (artifact writes, temp files, os-release reads)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The process is not running with root privileges
    #[error("Root privileges required: {0}")]
    NotPrivileged(String),

    /// Write-once state violations
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Template rendering failures
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Random source failures
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Run state machine transition errors
    #[error("Run transition error: {0}")]
    RunTransition(#[from] RunTransitionError),

    /// A step needed a secret that an earlier action failed to generate
    #[error("{0} has not been generated")]
    MissingSecret(SecretKind),

    /// Release metadata lookup failures
    #[error("Release lookup failed: {0}")]
    Release(String),

    /// External command failures surfaced as errors (ownership changes)
    #[error("Command failed: {0}")]
    Command(String),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallError>;

impl InstallError {
    /// Create a privilege error
    pub fn not_privileged(msg: impl Into<String>) -> Self {
        Self::NotPrivileged(msg.into())
    }

    /// Create a release lookup error
    pub fn release(msg: impl Into<String>) -> Self {
        Self::Release(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InstallError::not_privileged("run as root: sudo su -");
        assert_eq!(
            err.to_string(),
            "Root privileges required: run as root: sudo su -"
        );

        let err = InstallError::command("chown exited with code 1");
        assert_eq!(err.to_string(), "Command failed: chown exited with code 1");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InstallError = io_err.into();
        assert!(matches!(err, InstallError::Io(_)));
    }

    #[test]
    fn test_state_error_conversion() {
        let err: InstallError = StateError::SecretAlreadySet(SecretKind::AppKey).into();
        assert!(matches!(err, InstallError::State(_)));
        assert!(err.to_string().contains("app-key"));
    }

    #[test]
    fn test_missing_secret_names_kind() {
        let err = InstallError::MissingSecret(SecretKind::PanelDbPassword);
        assert_eq!(err.to_string(), "panel-db-password has not been generated");
    }
}
