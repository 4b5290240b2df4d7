//! Step orchestrator
//!
//! Walks the plan in order and applies the same policy to every step:
//!
//! 1. gate closed → `SkippedGated`
//! 2. guard satisfied → `SkippedAlreadySatisfied`, no actions
//! 3. no action table for this platform → warning, `SkippedUnsupportedPlatform`
//! 4. run every action, collecting failures without stopping
//! 5. record `Succeeded` or `Failed(reasons)` and move to the next step
//!
//! A failed step never stops the run. The only fatal condition is the
//! privilege preflight, checked before anything is touched.
//!
//! # Design
//!
//! - The orchestrator borrows the host through three traits (`CommandRunner`,
//!   `HostProbe`, `ReleaseSource`) so a run can be replayed against fakes
//! - `ConfigState` is threaded as `&mut` and only `GenerateSecret` writes it
//! - The `RunTracker` rejects any attempt to revisit an earlier phase

use std::io::Write;
use std::path::Path;

use crate::error::{InstallError, Result};
use crate::layout::Layout;
use crate::plan::{
    Action, DatabaseTarget, Guard, Phase, StepContext, StepDescriptor, shell_quote, standard_plan,
};
use crate::platform::PlatformFamily;
use crate::releases::{self, ReleaseSource};
use crate::render::{self, Owner, TemplateKind};
use crate::report::{RunReport, StepOutcome};
use crate::run_state::{RunStage, RunTracker};
use crate::runner::{CommandRunner, HostProbe};
use crate::sanity;
use crate::state::{ConfigState, SecretKind};
use crate::ui;

/// Executes a provisioning plan against a host.
pub struct Orchestrator<'a> {
    runner: &'a dyn CommandRunner,
    probe: &'a dyn HostProbe,
    releases: &'a dyn ReleaseSource,
    platform: PlatformFamily,
    layout: Layout,
    plan: Vec<StepDescriptor>,
    tracker: RunTracker,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator for the standard plan.
    pub fn new(
        runner: &'a dyn CommandRunner,
        probe: &'a dyn HostProbe,
        releases: &'a dyn ReleaseSource,
        platform: PlatformFamily,
        layout: Layout,
    ) -> Self {
        Self {
            runner,
            probe,
            releases,
            platform,
            layout,
            plan: standard_plan(),
            tracker: RunTracker::new(),
        }
    }

    /// Replace the plan (phase order must still be non-decreasing).
    pub fn with_plan(mut self, plan: Vec<StepDescriptor>) -> Self {
        self.plan = plan;
        self
    }

    #[inline]
    pub fn platform(&self) -> PlatformFamily {
        self.platform
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Current stage of the run.
    #[inline]
    pub fn stage(&self) -> RunStage {
        self.tracker.current()
    }

    /// Stage transitions so far.
    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    /// Verify the process may provision this host.
    ///
    /// # Errors
    ///
    /// `InstallError::NotPrivileged` if the host reports no root privileges.
    /// The failure banner is printed and the run is Aborted, so `run` will
    /// refuse to start.
    pub fn preflight(&mut self) -> Result<()> {
        let result = sanity::verify_environment(self.probe);
        if result.is_ok() {
            tracing::debug!("Preflight passed");
            return Ok(());
        }

        self.tracker.abort()?;
        tracing::error!("Preflight failed: not running as root");
        sanity::print_preflight_failure(&result);
        Err(InstallError::not_privileged(
            "the installer must run as root (sudo su -)",
        ))
    }

    /// Run every step of the plan in order.
    ///
    /// Step failures are recorded in the report, never returned.
    ///
    /// # Errors
    ///
    /// `InstallError::RunTransition` if the run was aborted or already
    /// completed, or if the plan is out of phase order.
    pub fn run(&mut self, state: &mut ConfigState) -> Result<RunReport> {
        tracing::info!(platform = %self.platform, domain = state.domain(), "Starting provisioning run");
        if !self.platform.is_known() {
            ui::warn("Unrecognized operating system: OS-specific steps will be skipped");
        }

        let mut report = RunReport::new();
        let mut current: Option<Phase> = None;

        for step in &self.plan {
            self.tracker.enter_phase(step.phase)?;
            if current != Some(step.phase) {
                ui::header(&format!("{}. {}", step.phase.order() + 1, step.phase));
                current = Some(step.phase);
            }

            let outcome = self.execute_step(step, state);
            match &outcome {
                StepOutcome::Succeeded => tracing::info!(step = step.name, "Step succeeded"),
                StepOutcome::Failed(reason) => {
                    tracing::error!(step = step.name, "Step failed: {}", reason);
                    ui::fail(&format!("{} failed", step.name));
                }
                skipped => tracing::info!(step = step.name, "Step {}", skipped),
            }
            report.push(step.name, step.phase, outcome);
        }

        self.tracker.complete()?;
        tracing::info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Provisioning run finished"
        );
        Ok(report)
    }

    fn execute_step(&self, step: &StepDescriptor, state: &mut ConfigState) -> StepOutcome {
        if let Some(gate) = step.gate {
            if !gate.allows(state) {
                ui::info(&format!("Skipping {}: not requested", step.name));
                return StepOutcome::SkippedGated;
            }
        }

        if let Some(guard) = &step.guard {
            if self.guard_satisfied(guard) {
                ui::ok(&format!("{}: {}, skipping", step.name, guard));
                return StepOutcome::SkippedAlreadySatisfied;
            }
        }

        let Some(builder) = step.actions.lookup(self.platform) else {
            tracing::warn!(step = step.name, "No actions for platform {}", self.platform);
            ui::warn(&format!(
                "{}: unsupported platform, skipping OS-specific actions",
                step.name
            ));
            return StepOutcome::SkippedUnsupportedPlatform;
        };

        let actions = builder(&StepContext {
            state,
            layout: &self.layout,
        });

        let mut failures = Vec::new();
        for action in &actions {
            tracing::debug!(step = step.name, "{}", action.describe());
            if let Err(e) = self.execute_action(action, state) {
                // Command failures were already printed by the runner
                if !matches!(e, InstallError::Command(_)) {
                    ui::fail(&format!("{}: {}", action.describe(), e));
                }
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            ui::ok(&format!("{} complete", step.name));
            StepOutcome::Succeeded
        } else {
            StepOutcome::Failed(failures.join("; "))
        }
    }

    fn guard_satisfied(&self, guard: &Guard) -> bool {
        match guard {
            Guard::CommandPresent(cmd) => self.probe.has_command(cmd),
            Guard::CommandOutputContains { command, needle } => self
                .probe
                .command_output(command)
                .is_some_and(|out| out.contains(needle)),
            Guard::UserExists(user) => self.probe.user_exists(user),
        }
    }

    fn execute_action(&self, action: &Action, state: &mut ConfigState) -> Result<()> {
        match action {
            Action::Shell {
                command,
                description,
            } => self.shell(command, description),
            Action::GenerateSecret(kind) => generate_secret(*kind, state),
            Action::SqlScript(target) => self.sql_script(*target, state),
            Action::Render {
                template,
                path,
                owner,
            } => self.render_artifact(*template, path, owner.as_ref(), state),
            Action::InstallLatestRelease { repo, asset, dest } => {
                self.install_release(repo, asset, dest)
            }
        }
    }

    fn shell(&self, command: &str, description: &str) -> Result<()> {
        let outcome = self.runner.run(command, description);
        if outcome.ok {
            return Ok(());
        }
        Err(InstallError::command(
            outcome
                .error_message
                .unwrap_or_else(|| format!("{} failed", description)),
        ))
    }

    /// Feed the provisioning SQL to the database engine.
    ///
    /// The script holds a password, so it lives in a 0600 temp file that is
    /// removed when this function returns, whatever the outcome.
    fn sql_script(&self, target: DatabaseTarget, state: &ConfigState) -> Result<()> {
        let password = state
            .secret(target.secret())
            .ok_or(InstallError::MissingSecret(target.secret()))?;

        std::fs::create_dir_all(&self.layout.tmp_dir)?;
        let mut script = tempfile::Builder::new()
            .prefix("ptero-db-")
            .suffix(".sql")
            .tempfile_in(&self.layout.tmp_dir)?;
        script.write_all(target.sql(password).as_bytes())?;
        script.flush()?;

        self.shell(
            &format!("mysql -u root < {}", script.path().display()),
            &format!("Provision {}", target),
        )
    }

    fn render_artifact(
        &self,
        template: TemplateKind,
        path: &Path,
        owner: Option<&Owner>,
        state: &ConfigState,
    ) -> Result<()> {
        let text = render::render(template, state, &self.layout)?;
        render::write(path, &text, owner, self.runner)?;
        ui::ok(&format!("Wrote {}", path.display()));
        Ok(())
    }

    fn install_release(&self, repo: &str, asset: &str, dest: &Path) -> Result<()> {
        let tag = self
            .releases
            .latest_tag(repo)
            .map_err(|e| InstallError::release(format!("{}: {:#}", repo, e)))?;
        if !releases::is_valid_tag(&tag) {
            return Err(InstallError::release(format!(
                "{}: refusing unexpected release tag {:?}",
                repo, tag
            )));
        }
        let url = self.releases.asset_url(repo, &tag, asset);
        let dest_arg = shell_quote(&dest.display().to_string());

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.shell(
            &format!("curl -fL -o {} {}", dest_arg, shell_quote(&url)),
            &format!("Download {} {}", asset, tag),
        )?;
        self.shell(
            &format!("chmod +x {}", dest_arg),
            &format!("Make {} executable", asset),
        )
    }
}

/// Generate `kind` unless this run already holds it.
fn generate_secret(kind: SecretKind, state: &mut ConfigState) -> Result<()> {
    if state.secret(kind).is_some() {
        tracing::debug!("Keeping existing {}", kind);
        return Ok(());
    }
    let value = kind.generate()?;
    state.set_secret(kind, value)?;
    tracing::info!("Generated {}", kind);
    Ok(())
}
