//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--log-format <plain|actions>`: Log line format
//!
//! Every `sync` setting also reads an environment variable, so the binary
//! runs inside a GitHub Actions workflow without extra wiring.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::DEFAULT_CONFIG_PATH;
use crate::core::types::{BranchName, RepoRef};
use crate::engine::sync::DEFAULT_HEAD_BRANCH;
use crate::forge::github::DEFAULT_API_BASE;
use crate::logging::LogFormat;

/// Default web URL of the forge.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// lnsync - keep files in sync across GitHub repositories through pull requests
#[derive(Parser, Debug)]
#[command(name = "lnsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output: warnings, errors and nothing else
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format [default: actions inside GitHub Actions, else plain]
    #[arg(long, global = true, value_enum, env = "LNSYNC_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy linked files into their targets and open pull requests
    #[command(
        name = "sync",
        long_about = "Copy linked files into their targets and open pull requests.\n\n\
            Reads the configuration document from --repo, resolves every link and \
            groups them by destination repository. For each destination, changed \
            targets are committed to the head branch and one pull request is opened \
            (or reused) against the default branch. A head branch created by the run \
            that ends up with no changes is deleted again.",
        after_help = "\
EXAMPLES:
    # Inside a workflow (token, repository and run id come from the environment)
    lnsync sync

    # From a terminal
    GITHUB_TOKEN=... lnsync sync --repo octocat/templates

    # Read the configuration from a branch and commit to a custom head branch
    lnsync sync --repo octocat/templates --config-ref next --head-branch sync/next

EXIT STATUS:
    Non-zero when any destination repository failed; the others are still
    processed and reported."
    )]
    Sync(SyncArgs),

    /// Resolve a local configuration file and print its links
    #[command(
        name = "check",
        long_about = "Resolve a local configuration file and print its links.\n\n\
            Parses the document, applies defaults, drops self links and prints the \
            result grouped by destination repository. No network access.",
        after_help = "\
EXAMPLES:
    # Check the default configuration path
    lnsync check

    # Resolve links the way `sync` would when run from octocat/templates
    lnsync check --repo octocat/templates

    # Machine-readable output
    lnsync check --json .github/lnsync.yaml"
    )]
    Check {
        /// Configuration file to read
        #[arg(default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,

        /// Repository the file belongs to; fills links that name no repository
        #[arg(long)]
        repo: Option<RepoRef>,

        /// Print the resolved groups as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    lnsync completion bash > /etc/bash_completion.d/lnsync

    # Zsh
    lnsync completion zsh > \"${fpath[1]}/_lnsync\"

    # Fish
    lnsync completion fish > ~/.config/fish/completions/lnsync.fish

    # PowerShell
    lnsync completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Settings of the `sync` command.
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// GitHub token with contents and pull request write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Repository holding the configuration document (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: RepoRef,

    /// Path of the configuration document inside --repo
    #[arg(long, env = "LNSYNC_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config_path: String,

    /// Ref to read the configuration document from [default: repository default branch]
    #[arg(long)]
    pub config_ref: Option<String>,

    /// REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    pub api_url: String,

    /// Web URL used for links in pull request bodies
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Workflow run linked from pull request bodies
    #[arg(long, env = "GITHUB_RUN_ID")]
    pub run_id: Option<String>,

    /// Branch the updates are committed to in each destination repository
    #[arg(long, env = "LNSYNC_HEAD_BRANCH", default_value = DEFAULT_HEAD_BRANCH)]
    pub head_branch: BranchName,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_defaults() {
        let cli = Cli::try_parse_from(["lnsync", "check"]).unwrap();
        match cli.command {
            Command::Check { path, repo, json } => {
                assert_eq!(path, PathBuf::from(DEFAULT_CONFIG_PATH));
                assert!(repo.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn sync_flags() {
        let cli = Cli::try_parse_from([
            "lnsync",
            "--quiet",
            "sync",
            "--token",
            "t",
            "--repo",
            "octocat/templates",
            "--head-branch",
            "sync/docs",
            "--run-id",
            "7",
        ])
        .unwrap();
        assert!(cli.quiet);

        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.repo, RepoRef::new("octocat", "templates"));
        assert_eq!(args.head_branch.as_str(), "sync/docs");
        assert_eq!(args.run_id.as_deref(), Some("7"));
        assert_eq!(args.config_path, DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn invalid_repo_rejected() {
        let result = Cli::try_parse_from(["lnsync", "check", "--repo", "no-slash"]);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_head_branch_rejected() {
        let result = Cli::try_parse_from([
            "lnsync",
            "sync",
            "--token",
            "t",
            "--repo",
            "o/r",
            "--head-branch",
            "bad name",
        ]);
        assert!(result.is_err());
    }
}
