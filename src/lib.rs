//! ptero-install Library
//!
//! Core of the single-host Pterodactyl installer: the declarative step plan,
//! the orchestrator that runs it, and the leaf components it drives.

pub mod cli;
pub mod collector;
pub mod ui;
pub mod credentials;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod plan;
pub mod platform;
pub mod releases;
pub mod render;
pub mod report;
pub mod run_state;
pub mod runner;
pub mod sanity;
pub mod state;

// Re-export main types for convenience
pub use collector::{InquirePrompter, Prompter, collect};
pub use error::{InstallError, Result};
pub use layout::Layout;
pub use orchestrator::Orchestrator;
pub use plan::{Action, ActionTable, Gate, Guard, Phase, StepDescriptor, standard_plan};
pub use platform::PlatformFamily;
pub use releases::{GitHubReleases, ReleaseSource};
pub use render::{RenderError, TemplateKind};
pub use report::{RunReport, StepOutcome, StepRecord};
pub use run_state::{RunStage, RunTracker, RunTransitionError};
pub use runner::{CommandOutcome, CommandRunner, HostProbe, ShellRunner, SystemProbe};
pub use state::{ConfigState, SecretKind, StateError};
