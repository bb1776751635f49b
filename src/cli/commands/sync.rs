//! cli::commands::sync
//!
//! Fetch the configuration document, resolve it and synchronize every
//! destination repository.
//!
//! # Example
//!
//! ```bash
//! # Inside a workflow
//! lnsync sync
//!
//! # From a terminal
//! GITHUB_TOKEN=... lnsync sync --repo octocat/templates --config-ref main
//! ```
//!
//! Ctrl-C cancels the run; the group in flight is abandoned and the command
//! reports how many groups completed.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::cli::args::SyncArgs;
use crate::core::config::Config;
use crate::core::types::FileRef;
use crate::engine::{SyncSettings, Synchronizer};
use crate::forge::github::GitHubForge;
use crate::forge::FileFetcher;
use crate::ui::output::{self, Verbosity};
use crate::ui::pull_body::{execution_url, file_url};
use crate::ui::template::{Formatter, RunLinks};

/// Run the sync command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn sync(args: SyncArgs, verbosity: Verbosity) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let cancel = CancellationToken::new();

    rt.block_on(async {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping");
                interrupt.cancel();
            }
        });

        sync_async(args, verbosity, &cancel).await
    })
}

/// Async implementation of sync.
async fn sync_async(args: SyncArgs, verbosity: Verbosity, cancel: &CancellationToken) -> Result<()> {
    let forge = GitHubForge::with_api_base(args.token, &args.api_url);

    let mut source = FileRef::new(args.repo.clone(), &args.config_path);
    if let Some(git_ref) = &args.config_ref {
        source = source.with_ref(git_ref);
    }

    tracing::debug!(source = %source, "fetching configuration");
    forge
        .get_file(&source)
        .await
        .with_context(|| format!("failed to fetch configuration {}", source))?
        .populate(&mut source);

    let links = RunLinks {
        execution: args
            .run_id
            .as_deref()
            .map(|id| execution_url(&args.server_url, &args.repo, id)),
        configuration: Some(file_url(&args.server_url, &source)),
    };

    let config = Config::from_source(source.clone())
        .with_context(|| format!("invalid configuration {}", source))?;
    let groups = config.links.groups();
    if groups.is_empty() {
        tracing::warn!(source = %source, "configuration declares no links");
    }

    let formatter = Formatter::new(links);
    let settings = SyncSettings {
        head_branch: args.head_branch,
    };
    let report = Synchronizer::new(&forge, &formatter, settings)
        .run(groups, cancel)
        .await?;

    output::print(output::format_report(&report), verbosity);
    report.into_result()?;
    Ok(())
}
