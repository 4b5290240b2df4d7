//! Operator-facing console output.
//!
//! Everything the operator watches live goes through here: phase headers,
//! in-progress markers, success and failure lines. Structured logging runs
//! alongside via `tracing`; these helpers are only the human projection.
//!
//! Colour is decided by the `console` crate per stream (TTY detection,
//! `CLICOLOR`/`CLICOLOR_FORCE`). `NO_COLOR` is honoured by [`init`].

use console::{Emoji, style};

/// Marker symbols, with ASCII fallbacks for terminals without Unicode.
pub struct Symbols;

impl Symbols {
    pub const STEP: &'static str = "[.]";
    pub const SUCCESS: Emoji<'static, 'static> = Emoji("✓", "+");
    pub const WARNING: Emoji<'static, 'static> = Emoji("⚠", "!");
    pub const ERROR: Emoji<'static, 'static> = Emoji("✗", "x");
}

/// Apply colour preferences from the environment.
pub fn init() {
    if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
}

/// A success line for stdout.
pub fn ok_line(msg: &str) -> String {
    format!("{} {}", style(Symbols::SUCCESS).green(), msg)
}

/// A warning line for stdout.
pub fn warn_line(msg: &str) -> String {
    format!("{} {}", style(Symbols::WARNING).yellow(), msg)
}

/// A failure line for stdout. [`fail`] styles for stderr instead.
pub fn fail_line(msg: &str) -> String {
    format!("{} {}", style(Symbols::ERROR).red(), msg)
}

/// Print a boxed section header.
pub fn header(title: &str) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("{}", style(title).cyan().bold());
    println!("{}\n", rule);
}

/// Print an informational line.
pub fn info(msg: &str) {
    println!("{}", style(msg).cyan());
}

/// Print an in-progress marker.
pub fn step(msg: &str) {
    println!("{} {}", style(Symbols::STEP).yellow(), msg);
}

pub fn ok(msg: &str) {
    println!("{}", ok_line(msg));
}

pub fn warn(msg: &str) {
    println!("{}", warn_line(msg));
}

/// Print a failure marker to stderr.
pub fn fail(msg: &str) {
    eprintln!("{} {}", style(Symbols::ERROR).red().for_stderr(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_keep_message_text_intact() {
        assert!(ok_line("Wrote /etc/x").ends_with(" Wrote /etc/x"));
        assert!(warn_line("TLS skipped").ends_with(" TLS skipped"));
        assert!(fail_line("nginx failed").ends_with(" nginx failed"));
    }
}
