//! Run report
//!
//! Structured record of what every step did. The console markers printed
//! during a run are a projection of this; the final summary is derived from it.

use std::fmt;

use crate::layout::Layout;
use crate::plan::{Phase, steps};
use crate::state::{ConfigState, SecretKind};
use crate::ui;

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The operator did not ask for this step
    SkippedGated,
    /// The idempotency guard found nothing to do
    SkippedAlreadySatisfied,
    /// No actions exist for the detected platform; nothing ran
    SkippedUnsupportedPlatform,
    Succeeded,
    /// At least one action failed; the reasons are joined
    Failed(String),
}

impl StepOutcome {
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[inline]
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::SkippedGated | Self::SkippedAlreadySatisfied | Self::SkippedUnsupportedPlatform
        )
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkippedGated => write!(f, "skipped (not requested)"),
            Self::SkippedAlreadySatisfied => write!(f, "skipped (already satisfied)"),
            Self::SkippedUnsupportedPlatform => write!(f, "skipped (unsupported platform)"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome of one step, in plan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: &'static str,
    pub phase: Phase,
    pub outcome: StepOutcome,
}

/// Ordered step records of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    records: Vec<StepRecord>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, phase: Phase, outcome: StepOutcome) {
        self.records.push(StepRecord {
            name,
            phase,
            outcome,
        });
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Outcome of the step called `name`, if it was recorded.
    pub fn outcome_of(&self, name: &str) -> Option<&StepOutcome> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| *o == StepOutcome::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(StepOutcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(StepOutcome::is_skipped)
    }

    /// Records of failed steps, in order.
    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(|r| r.outcome.is_failure())
    }

    /// Returns true if no step failed.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{:<20} {}", record.name, record.outcome)?;
        }
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.succeeded(),
            self.skipped(),
            self.failed()
        )
    }
}

// ============================================================================
// Final summary
// ============================================================================

/// Returns true if the TLS step ran and succeeded.
pub fn tls_active(report: &RunReport) -> bool {
    report.outcome_of(steps::TLS_CERTIFICATE) == Some(&StepOutcome::Succeeded)
}

/// URL the panel is reachable on after this run.
pub fn panel_url(report: &RunReport, state: &ConfigState) -> String {
    let scheme = if tls_active(report) { "https" } else { "http" };
    format!("{}://{}", scheme, state.domain())
}

/// Body of the end-of-run summary, one entry per output line.
pub fn render_summary(report: &RunReport, state: &ConfigState, layout: &Layout) -> Vec<String> {
    let mut lines = Vec::new();

    for record in report.failures() {
        lines.push(ui::fail_line(&format!("{}: {}", record.name, record.outcome)));
    }
    lines.push(format!(
        "{} steps succeeded, {} skipped, {} failed",
        report.succeeded(),
        report.skipped(),
        report.failed()
    ));

    lines.push(String::new());
    lines.push(format!("Panel URL: {}", panel_url(report, state)));

    match report.outcome_of(steps::TLS_CERTIFICATE) {
        Some(StepOutcome::Failed(_)) => lines.push(ui::warn_line(
            "TLS certificate was not issued; the panel is served over plain HTTP",
        )),
        Some(StepOutcome::SkippedUnsupportedPlatform) => lines.push(ui::warn_line(
            "TLS certificate was not issued (unsupported platform); the panel is served over plain HTTP",
        )),
        Some(StepOutcome::SkippedGated) | None => lines.push(ui::warn_line(
            "TLS was not requested; the panel is served over plain HTTP",
        )),
        _ => {}
    }

    let daemon_incomplete = steps::DAEMON_STEPS.iter().any(|name| {
        matches!(
            report.outcome_of(name),
            Some(StepOutcome::Failed(_) | StepOutcome::SkippedUnsupportedPlatform)
        )
    });

    if !state.install_secondary_daemon {
        lines.push(ui::warn_line(
            "Wings was not installed; this host cannot run game servers",
        ));
    } else if daemon_incomplete {
        lines.push(ui::warn_line(
            "Wings setup failed; node functionality is unavailable until it is fixed",
        ));
    } else if let Some(key) = state.secret(SecretKind::DaemonApiKey) {
        lines.push(format!("Wings API key: {}", key));
    }

    lines.push(String::new());
    lines.push("Next steps:".to_string());
    lines.push(format!(
        "  1. Create an admin user: cd {} && php artisan p:user:make",
        layout.panel_dir.display()
    ));
    if state.install_secondary_daemon && !daemon_incomplete {
        lines.push(
            "  2. Add this node in the panel, then start Wings: systemctl start wings".to_string(),
        );
    }
    lines
}

/// Print the end-of-run summary.
pub fn print_summary(report: &RunReport, state: &ConfigState, layout: &Layout) {
    ui::header("Installation finished");
    for line in render_summary(report, state, layout) {
        println!("{}", line);
    }
}
