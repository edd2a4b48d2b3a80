//! Terminal styling for human output.
//!
//! Respects `NO_COLOR`, `FORCE_COLOR`, dumb terminals and piped stdout.

use std::io::IsTerminal;

use colored::{ColoredString, Colorize};

/// Whether styled output should be emitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSupport {
    None,
    Basic,
}

impl ColorSupport {
    #[must_use]
    pub fn detect() -> Self {
        if std::env::var_os("NO_COLOR").is_some() {
            return Self::None;
        }
        if std::env::var_os("FORCE_COLOR").is_some() {
            return Self::Basic;
        }
        if !std::io::stdout().is_terminal() {
            return Self::None;
        }
        if std::env::var("TERM").is_ok_and(|term| term == "dumb") {
            return Self::None;
        }
        Self::Basic
    }

    /// Make the `colored` crate follow the detected support.
    pub fn apply(self) {
        colored::control::set_override(self == Self::Basic);
    }
}

/// Semantic styles shared by the command renderers.
pub struct SkpStyles;

impl SkpStyles {
    pub fn success<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().green()
    }

    pub fn error<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().red().bold()
    }

    pub fn warning<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().yellow()
    }

    pub fn muted<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().dimmed()
    }

    pub fn bold<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().bold()
    }

    pub fn skill<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().cyan().bold()
    }

    pub fn path<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().blue()
    }

    pub fn command<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().cyan()
    }

    /// Success checkmark (✓)
    pub fn check() -> ColoredString {
        "✓".green().bold()
    }

    /// Error X (✗)
    pub fn cross() -> ColoredString {
        "✗".red().bold()
    }

    /// Warning indicator (!)
    pub fn exclaim() -> ColoredString {
        "!".yellow()
    }
}
