//! cli::commands::check
//!
//! Resolve a local configuration file without touching the network.
//!
//! # Example
//!
//! ```bash
//! lnsync check --repo octocat/templates .github/lnsync.yaml
//! ```
//!
//! ```text
//! octocat/api:
//!   octocat/templates:LICENSE -> octocat/api:LICENSE
//! ```

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::config::Config;
use crate::core::types::RepoRef;
use crate::ui::output::{self, Verbosity};

/// Run the check command.
pub fn check(path: &Path, repo: Option<RepoRef>, json: bool, verbosity: Verbosity) -> Result<()> {
    let config = Config::load_with_origin(path, repo)
        .with_context(|| format!("invalid configuration {}", path.display()))?;

    let links = config.links.len();
    let groups = config.links.groups();
    tracing::debug!(links, groups = groups.len(), "resolved configuration");

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        output::print("No links.", verbosity);
    } else {
        output::print(groups.to_string().trim_end(), verbosity);
    }
    Ok(())
}
