//! ptero-install - Main entry point
//!
//! Preflight, prompts, then one pass over the provisioning plan.

use anyhow::Context;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use ptero_install::cli::Cli;
use ptero_install::{
    ConfigState, GitHubReleases, InquirePrompter, Layout, Orchestrator, ShellRunner, SystemProbe,
    collector, platform, report, ui,
};

/// Initialize the logger with appropriate settings
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application entry point
fn main() -> ExitCode {
    init_logger();
    ui::init();
    let _cli = Cli::parse_args();
    info!("ptero-install {} starting up", env!("CARGO_PKG_VERSION"));

    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ui::fail(&format!("Installation aborted: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let family = platform::detect();
    info!("Detected platform: {}", family);
    let layout = Layout::for_platform(family);

    let runner = ShellRunner::new();
    let probe = SystemProbe::new();
    let releases = GitHubReleases::new();
    let mut orchestrator = Orchestrator::new(&runner, &probe, &releases, family, layout);

    if let Err(e) = orchestrator.preflight() {
        debug!("Refusing to start: {}", e);
        return Ok(ExitCode::FAILURE);
    }
    debug!("Preflight passed");

    ui::header("Pterodactyl installer");
    let mut state: ConfigState =
        collector::collect(&mut InquirePrompter).context("Failed to collect configuration")?;

    let run_report = orchestrator
        .run(&mut state)
        .context("Provisioning run could not proceed")?;

    report::print_summary(&run_report, &state, orchestrator.layout());
    Ok(ExitCode::SUCCESS)
}
