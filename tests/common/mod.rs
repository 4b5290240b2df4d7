//! Shared fakes for orchestrator integration tests.
//!
//! `FakeHost` stands in for the machine being provisioned: it records every
//! command instead of running it, answers guard probes from in-memory sets,
//! and captures SQL scripts while they still exist on disk.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;

use ptero_install::releases::ReleaseSource;
use ptero_install::runner::{CommandOutcome, CommandRunner, HostProbe};
use ptero_install::{ConfigState, Layout};

pub const SQL_PREFIX: &str = "mysql -u root < ";

/// Recording fake for both the runner and the probe.
#[derive(Default)]
pub struct FakeHost {
    pub commands: RefCell<Vec<String>>,
    /// Contents of SQL scripts read at execution time, with their paths
    pub sql_scripts: RefCell<Vec<(String, String)>>,
    pub present: RefCell<HashSet<String>>,
    pub users: RefCell<HashSet<String>>,
    pub php_version: RefCell<Option<String>>,
    /// Commands containing any of these substrings fail
    pub fail_patterns: Vec<String>,
    pub unprivileged: bool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(tools: &[&str]) -> Self {
        let host = Self::new();
        for tool in tools {
            host.present.borrow_mut().insert(tool.to_string());
        }
        host
    }

    pub fn failing(mut self, pattern: &str) -> Self {
        self.fail_patterns.push(pattern.to_string());
        self
    }

    /// Make every guard of the standard plan report "already satisfied".
    pub fn mark_provisioned(&self) {
        let mut present = self.present.borrow_mut();
        for tool in ["docker", "docker-compose", "nginx", "composer", "mysql"] {
            present.insert(tool.to_string());
        }
        let mut users = self.users.borrow_mut();
        users.insert("pterodactyl".to_string());
        users.insert("pterodactylwings".to_string());
        *self.php_version.borrow_mut() = Some("PHP 8.2.12 (cli) (NTS)".to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
        self.sql_scripts.borrow_mut().clear();
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands.borrow().iter().any(|c| c.contains(needle))
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, command: &str, description: &str) -> CommandOutcome {
        self.commands.borrow_mut().push(command.to_string());

        if let Some(path) = command.strip_prefix(SQL_PREFIX) {
            let text = std::fs::read_to_string(path).unwrap_or_default();
            self.sql_scripts
                .borrow_mut()
                .push((path.to_string(), text));
        }

        if self.fail_patterns.iter().any(|p| command.contains(p.as_str())) {
            return CommandOutcome::failure(format!("{} failed (exit code 1)", description));
        }
        CommandOutcome::success()
    }
}

impl HostProbe for FakeHost {
    fn has_command(&self, name: &str) -> bool {
        self.present.borrow().contains(name)
    }

    fn user_exists(&self, name: &str) -> bool {
        self.users.borrow().contains(name)
    }

    fn command_output(&self, command: &str) -> Option<String> {
        if command.starts_with("php") {
            self.php_version.borrow().clone()
        } else {
            None
        }
    }

    fn is_privileged(&self) -> bool {
        !self.unprivileged
    }
}

/// Release source with a fixed answer.
pub struct FakeReleases {
    pub tag: Option<&'static str>,
}

impl FakeReleases {
    pub fn latest(tag: &'static str) -> Self {
        Self { tag: Some(tag) }
    }

    pub fn offline() -> Self {
        Self { tag: None }
    }
}

impl ReleaseSource for FakeReleases {
    fn latest_tag(&self, repo: &str) -> anyhow::Result<String> {
        self.tag
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("api.github.com unreachable for {}", repo))
    }
}

pub fn state(daemon: bool, tls: bool) -> ConfigState {
    ConfigState::new("panel.example.com", "admin@example.com", "UTC", daemon, tls)
        .expect("valid state")
}

pub fn staged_layout(root: &Path) -> Layout {
    Layout::default().rooted(root)
}

/// Files left in the temp directory.
pub fn leftover_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}
