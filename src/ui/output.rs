//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Diagnostics during a
//! run go through `tracing` instead (see [`crate::logging`]).

use std::fmt::Display;

use tracing::Level;

use crate::engine::SyncReport;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - warnings and errors only
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. `quiet` wins over `debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Most verbose log level shown.
    pub fn level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::WARN,
            Verbosity::Normal => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summary of a synchronization run.
pub fn format_report(report: &SyncReport) -> String {
    if report.groups.is_empty() {
        return "Nothing to synchronize.".to_string();
    }

    let lines: Vec<String> = report.to_string().lines().map(str::to_string).collect();
    let mut out = format_list(&lines, "  ");
    out.insert_str(0, &format!("Synchronized {} group(s):\n", report.groups.len()));
    if !report.is_success() {
        out.push_str(&format!("\n{} group(s) failed", report.failed()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RepoRef;
    use crate::engine::{GroupOutcome, GroupReport, SyncError};

    #[test]
    fn quiet_wins() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false).level(), Level::INFO);
    }

    #[test]
    fn list_prefix() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
    }

    #[test]
    fn empty_report() {
        assert_eq!(format_report(&SyncReport::default()), "Nothing to synchronize.");
    }

    #[test]
    fn report_with_failure() {
        let report = SyncReport {
            groups: vec![
                GroupReport {
                    repo: RepoRef::new("o", "a"),
                    links: 1,
                    result: Ok(GroupOutcome::CleanedUp),
                },
                GroupReport {
                    repo: RepoRef::new("o", "b"),
                    links: 2,
                    result: Err(SyncError::Branch {
                        repo: "o/b".into(),
                        source: crate::forge::ForgeError::RateLimited,
                    }),
                },
            ],
        };
        let out = format_report(&report);
        assert!(out.starts_with("Synchronized 2 group(s):\n  o/a: up to date\n  o/b: failed:"));
        assert!(out.ends_with("1 group(s) failed"));
    }
}
