//! Interactive configuration collection.
//!
//! Turns operator answers into the initial `ConfigState`. Prompting sits
//! behind the `Prompter` trait so the validation loop can be driven by a
//! scripted prompter in tests; production uses `inquire`.

use anyhow::{Context, Result};

use crate::state::ConfigState;
use crate::ui;

pub const DEFAULT_DOMAIN: &str = "panel.example.com";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Source of operator answers.
pub trait Prompter {
    /// Ask for free text, returning `default` on empty input.
    fn text(&mut self, message: &str, default: &str) -> Result<String>;

    /// Ask a yes/no question.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Terminal prompter backed by `inquire`.
#[derive(Debug, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn text(&mut self, message: &str, default: &str) -> Result<String> {
        inquire::Text::new(message)
            .with_default(default)
            .prompt()
            .with_context(|| format!("Prompt aborted: {}", message))
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        inquire::Confirm::new(message)
            .with_default(default)
            .prompt()
            .with_context(|| format!("Prompt aborted: {}", message))
    }
}

/// Validate a panel domain answer.
///
/// Blank input is rejected; anything else is accepted as typed.
pub fn validate_domain(input: &str) -> std::result::Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Required")
    } else {
        Ok(())
    }
}

/// Gather the operator's choices into a fresh `ConfigState`.
///
/// Re-prompts for the domain until a non-blank value is given. Every other
/// answer accepts its default.
pub fn collect(prompter: &mut dyn Prompter) -> Result<ConfigState> {
    let domain = loop {
        let answer = prompter.text("Panel domain:", DEFAULT_DOMAIN)?;
        match validate_domain(&answer) {
            Ok(()) => break answer,
            Err(reason) => {
                ui::fail(reason);
                tracing::warn!("Rejected panel domain input: {}", reason);
            }
        }
    };

    let admin_email = prompter.text("Email for TLS registration:", DEFAULT_ADMIN_EMAIL)?;
    let timezone = prompter.text("Timezone:", DEFAULT_TIMEZONE)?;
    let install_secondary_daemon = prompter.confirm("Install Wings daemon?", true)?;
    let install_tls = prompter.confirm("Install TLS certificate (Let's Encrypt)?", true)?;

    let state = ConfigState::new(
        domain,
        admin_email,
        timezone,
        install_secondary_daemon,
        install_tls,
    )?;
    tracing::info!("Collected configuration: {:?}", state);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SecretKind;
    use std::collections::VecDeque;
    use strum::IntoEnumIterator;

    /// Replays canned answers; errors once they run out.
    struct ScriptedPrompter {
        texts: VecDeque<String>,
        confirms: VecDeque<bool>,
        text_prompts: usize,
    }

    impl ScriptedPrompter {
        fn new(texts: &[&str], confirms: &[bool]) -> Self {
            Self {
                texts: texts.iter().map(|s| s.to_string()).collect(),
                confirms: confirms.iter().copied().collect(),
                text_prompts: 0,
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn text(&mut self, _message: &str, _default: &str) -> Result<String> {
            self.text_prompts += 1;
            self.texts
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no scripted text answer left"))
        }

        fn confirm(&mut self, _message: &str, _default: bool) -> Result<bool> {
            self.confirms
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no scripted confirm answer left"))
        }
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("").is_err());
        assert!(validate_domain("   ").is_err());
        assert!(validate_domain("panel.example.com").is_ok());
    }

    #[test]
    fn test_collect_accepts_domain_unchanged() {
        let mut prompter = ScriptedPrompter::new(
            &["panel.example.com", "ops@example.com", "Europe/Berlin"],
            &[true, false],
        );
        let state = collect(&mut prompter).expect("collect");

        assert_eq!(state.domain(), "panel.example.com");
        assert_eq!(state.admin_email, "ops@example.com");
        assert_eq!(state.timezone, "Europe/Berlin");
        assert!(state.install_secondary_daemon);
        assert!(!state.install_tls);
        assert!(SecretKind::iter().all(|kind| state.secret(kind).is_none()));
    }

    #[test]
    fn test_collect_reprompts_on_empty_domain() {
        let mut prompter = ScriptedPrompter::new(
            &["", "  ", "node.example.org", "a@b.c", "UTC"],
            &[false, false],
        );
        let state = collect(&mut prompter).expect("collect");

        assert_eq!(state.domain(), "node.example.org");
        assert_eq!(prompter.text_prompts, 5);
    }

    #[test]
    fn test_collect_never_yields_state_for_only_empty_input() {
        let mut prompter = ScriptedPrompter::new(&["", ""], &[]);
        assert!(collect(&mut prompter).is_err());
    }
}
