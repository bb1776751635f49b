//! ui::template
//!
//! Rendering of commit messages and pull request text.
//!
//! # Syntax
//!
//! Templates are plain text with `{{ key }}` placeholders. Whitespace inside
//! the braces is ignored. There is no escaping and no logic; a placeholder
//! naming a key the context does not provide is an error rather than an
//! empty string.
//!
//! # Keys
//!
//! Commit messages (one link): `from`, `to`, `from_repo`, `from_path`,
//! `from_ref`, `to_repo`, `to_path`.
//!
//! Pull request title and body (one group): `repo`, `count`, `links` (the
//! From/To table), `quick_links`.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use lnsync::ui::template::render;
//!
//! let mut data = BTreeMap::new();
//! data.insert("to", "o/r:README.md".to_string());
//!
//! let out = render("auto(ln): update {{ to }}", &data).unwrap();
//! assert_eq!(out, "auto(ln): update o/r:README.md");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use super::pull_body;
use crate::core::link::{Group, Link};

/// Default commit message.
pub const DEFAULT_COMMIT_MESSAGE: &str = "auto(ln): update {{ to }}\n\nSynchronized from {{ from }}.";

/// Default pull request title.
pub const DEFAULT_PULL_TITLE: &str = "auto(ln): update links";

/// Default pull request body.
pub const DEFAULT_PULL_BODY: &str = "This automated PR updates the following files:

{{ links }}

---

{{ quick_links }}
";

/// Errors from template rendering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{` with no matching `}}`.
    #[error("unclosed placeholder at byte {0}")]
    Unclosed(usize),

    /// A placeholder naming a key the context does not provide.
    #[error("unknown template key '{0}'")]
    UnknownKey(String),

    /// `{{ }}` with nothing inside.
    #[error("empty placeholder at byte {0}")]
    EmptyKey(usize),
}

/// Render `template`, replacing each `{{ key }}` with `data[key]`.
///
/// # Errors
///
/// See [`TemplateError`].
pub fn render(template: &str, data: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        let close = after_open
            .find("}}")
            .ok_or(TemplateError::Unclosed(offset + open))?;

        let key = after_open[..close].trim();
        if key.is_empty() {
            return Err(TemplateError::EmptyKey(offset + open));
        }

        let value = data
            .get(key)
            .ok_or_else(|| TemplateError::UnknownKey(key.to_string()))?;
        out.push_str(value);

        let consumed = open + 2 + close + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Links shown in pull request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLinks {
    /// URL of the workflow run.
    pub execution: Option<String>,
    /// URL of the configuration document.
    pub configuration: Option<String>,
}

/// Renders the texts a synchronization run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    pub commit_message: String,
    pub pull_title: String,
    pub pull_body: String,
    pub links: RunLinks,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            pull_title: DEFAULT_PULL_TITLE.to_string(),
            pull_body: DEFAULT_PULL_BODY.to_string(),
            links: RunLinks::default(),
        }
    }
}

impl Formatter {
    pub fn new(links: RunLinks) -> Self {
        Self {
            links,
            ..Default::default()
        }
    }

    /// Commit message for writing one link's target.
    pub fn commit_message(&self, link: &Link) -> Result<String, TemplateError> {
        render(&self.commit_message, &link_data(link))
    }

    /// Pull request title for a group.
    pub fn pull_title(&self, group: &Group) -> Result<String, TemplateError> {
        render(&self.pull_title, &self.group_data(group))
    }

    /// Pull request body for a group.
    pub fn pull_body(&self, group: &Group) -> Result<String, TemplateError> {
        render(&self.pull_body, &self.group_data(group))
    }

    fn group_data(&self, group: &Group) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("repo", group.repo.to_string()),
            ("count", group.links.len().to_string()),
            ("links", pull_body::links_table(&group.links)),
            (
                "quick_links",
                pull_body::quick_links(
                    self.links.execution.as_deref(),
                    self.links.configuration.as_deref(),
                ),
            ),
        ])
    }
}

fn link_data(link: &Link) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("from", link.from.to_string()),
        ("to", link.to.to_string()),
        ("from_repo", link.from.repo.to_string()),
        ("from_path", link.from.path.clone()),
        ("from_ref", link.from.git_ref.clone()),
        ("to_repo", link.to.repo.to_string()),
        ("to_path", link.to.path.clone()),
    ])
}
