//! ui::pull_body
//!
//! Pure functions for generating the markdown pieces of a pull request
//! description.
//!
//! # Design
//!
//! Everything here takes immutable inputs and returns strings; the
//! [`Formatter`](super::template::Formatter) stitches the pieces into the
//! configured body template.
//!
//! # Example Output
//!
//! ```markdown
//! | From | To |
//! | --- | --- |
//! | `octocat/templates:LICENSE` | `octocat/api:LICENSE` |
//!
//! | Quick links | [execution](https://github.com/octocat/templates/actions/runs/42) | [configuration](https://github.com/octocat/templates/blob/main/.github/lnsync.yaml) |
//! | --- | --- | --- |
//! ```

use crate::core::link::Link;
use crate::core::types::{FileRef, RepoRef};

/// Generate the From/To table for a set of links.
///
/// # Example
///
/// ```
/// use lnsync::core::link::Link;
/// use lnsync::core::types::{FileRef, RepoRef};
/// use lnsync::ui::pull_body::links_table;
///
/// let link = Link::new(
///     FileRef::new(RepoRef::new("o", "src"), "a.md"),
///     FileRef::new(RepoRef::new("o", "dst"), "b.md"),
/// );
/// let table = links_table(&[link]);
/// assert!(table.contains("| `o/src:a.md` | `o/dst:b.md` |"));
/// ```
pub fn links_table(links: &[Link]) -> String {
    let mut lines = vec!["| From | To |".to_string(), "| --- | --- |".to_string()];
    for link in links {
        lines.push(format!(
            "| {} | {} |",
            code_cell(&link.from.to_string()),
            code_cell(&link.to.to_string())
        ));
    }
    lines.join("\n")
}

/// Generate the quick links row. Missing links are left out; with none at
/// all the result is empty.
pub fn quick_links(execution: Option<&str>, configuration: Option<&str>) -> String {
    let cells: Vec<String> = [("execution", execution), ("configuration", configuration)]
        .into_iter()
        .filter_map(|(label, url)| url.map(|u| format!("[{}]({})", label, u)))
        .collect();

    if cells.is_empty() {
        return String::new();
    }

    let separators = vec!["---"; cells.len() + 1].join(" | ");
    format!(
        "| Quick links | {} |\n| {} |",
        cells.join(" | "),
        separators
    )
}

/// URL of a workflow run.
pub fn execution_url(server: &str, repo: &RepoRef, run_id: &str) -> String {
    format!(
        "{}/{}/actions/runs/{}",
        server.trim_end_matches('/'),
        repo,
        run_id
    )
}

/// Web URL of a file. An empty ref points at `HEAD`.
pub fn file_url(server: &str, file: &FileRef) -> String {
    let git_ref = if file.git_ref.is_empty() {
        "HEAD"
    } else {
        &file.git_ref
    };
    format!(
        "{}/{}/blob/{}/{}",
        server.trim_end_matches('/'),
        file.repo,
        git_ref,
        file.path.trim_start_matches('/')
    )
}

/// Wrap text in a code span that survives a table cell.
fn code_cell(text: &str) -> String {
    format!("`{}`", text.replace('|', "\\|"))
}
