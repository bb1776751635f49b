//! core::link
//!
//! Synchronization edges and their resolution.
//!
//! # Resolution pipeline
//!
//! For each configuration entry, parsed `from` and `to` references go
//! through:
//!
//! 1. [`combine`] - Cartesian expansion into candidate [`Link`]s
//! 2. [`Defaults::apply`] - explicit defaults, cross-inheritance, then the
//!    origin repository
//! 3. [`Links::drop_self_edges`] - edges whose two sides are the same file
//!
//! The resulting [`Links`] keep document order. [`Links::groups`] then
//! partitions them by destination repository; each [`Group`] becomes one
//! head branch and one pull request.
//!
//! # Example
//!
//! ```
//! use lnsync::core::link::{combine, Defaults, Links};
//! use lnsync::core::reference::parse_str;
//!
//! let froms = vec![parse_str("o1/r1:p1").unwrap()];
//! let tos = vec![parse_str("p2").unwrap()];
//!
//! let mut links: Links = combine(froms, tos).into_iter().collect();
//! links.apply_defaults(&Defaults::default());
//!
//! assert_eq!(links[0].to_string(), "o1/r1:p1 -> o1/r1:p2");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, Index};

use serde::Serialize;

use super::types::{FileRef, RepoRef};

/// What the head branch was observed to hold for a link's target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HeadState {
    /// Not checked yet, or skipped because base content already matched.
    #[default]
    Unknown,
    /// The target file does not exist on the head branch.
    Missing,
    /// The target file exists on the head branch with this blob SHA.
    Present(String),
}

/// One synchronization edge: the content of `from` is mirrored into `to`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Link {
    pub from: FileRef,
    pub to: FileRef,
    /// Both sides have been fetched (`to` may have been missing).
    #[serde(skip)]
    pub populated: bool,
    /// Head-side observation recorded by the last update check.
    #[serde(skip)]
    pub head: HeadState,
}

impl Link {
    pub fn new(from: FileRef, to: FileRef) -> Self {
        Self {
            from,
            to,
            ..Default::default()
        }
    }

    /// Both sides point at the same file.
    pub fn is_self_edge(&self) -> bool {
        self.from == self.to
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl Eq for Link {}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Expand parsed references into candidate edges.
///
/// - no `from` yields nothing (logged)
/// - no `to` pairs each `from` with a target carrying only its path
/// - otherwise the full `from x to` product, `from`-major
pub fn combine(froms: Vec<FileRef>, tos: Vec<FileRef>) -> Vec<Link> {
    if froms.is_empty() {
        tracing::warn!("entry has no `from` reference, skipping");
        return Vec::new();
    }

    if tos.is_empty() {
        return froms
            .into_iter()
            .map(|from| {
                let to = FileRef::path_only(from.path.clone());
                Link::new(from, to)
            })
            .collect();
    }

    froms
        .iter()
        .flat_map(|from| tos.iter().map(move |to| Link::new(from.clone(), to.clone())))
        .collect()
}

/// Fallback values for fields an edge leaves unset.
///
/// Defaults never override an explicitly given value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    /// Explicit defaults from the document's `defaults` section.
    pub link: Option<Link>,
    /// Repository holding the configuration document.
    pub origin: Option<RepoRef>,
}

impl Defaults {
    pub fn new(link: Option<Link>, origin: Option<RepoRef>) -> Self {
        Self { link, origin }
    }

    pub fn with_origin(mut self, origin: RepoRef) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Fill unset fields of `link` in three passes.
    pub fn apply(&self, link: &mut Link) {
        if let Some(defaults) = &self.link {
            fill_repo(&mut link.from.repo, &defaults.from.repo);
            fill(&mut link.from.path, &defaults.from.path);
            fill_repo(&mut link.to.repo, &defaults.to.repo);
            fill(&mut link.to.path, &defaults.to.path);
        }

        fill_repo(&mut link.to.repo, &link.from.repo);
        fill(&mut link.to.path, &link.from.path);

        if let Some(origin) = &self.origin {
            fill_repo(&mut link.from.repo, origin);
            fill_repo(&mut link.to.repo, origin);
        }
    }
}

fn fill(field: &mut String, fallback: &str) {
    if field.is_empty() && !fallback.is_empty() {
        *field = fallback.to_string();
    }
}

// An empty repo is replaced whole; a partial one (`repo: name` without an
// owner) only has its missing half filled.
fn fill_repo(field: &mut RepoRef, fallback: &RepoRef) {
    if field.is_empty() {
        *field = fallback.clone();
        return;
    }
    fill(&mut field.owner, &fallback.owner);
    fill(&mut field.name, &fallback.name);
}

/// An ordered collection of edges; order is document order after expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Links(Vec<Link>);

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, link: Link) {
        self.0.push(link);
    }

    pub fn apply_defaults(&mut self, defaults: &Defaults) {
        for link in &mut self.0 {
            defaults.apply(link);
        }
    }

    /// Remove edges whose two sides are the same file.
    pub fn drop_self_edges(&mut self) {
        self.0.retain(|link| {
            if link.is_self_edge() {
                tracing::warn!(link = %link, "ignoring link pointing to itself");
                return false;
            }
            true
        });
    }

    /// Partition by destination repository, keeping document order inside
    /// each group.
    pub fn groups(self) -> Groups {
        let mut groups: BTreeMap<String, Group> = BTreeMap::new();
        for link in self.0 {
            let key = link.to.repo.to_string();
            groups
                .entry(key)
                .or_insert_with(|| Group::new(link.to.repo.clone()))
                .links
                .push(link);
        }
        Groups(groups)
    }

    pub fn into_vec(self) -> Vec<Link> {
        self.0
    }
}

impl Deref for Links {
    type Target = [Link];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<Link> for Links {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Link> for Links {
    fn extend<I: IntoIterator<Item = Link>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Links {
    type Item = Link;
    type IntoIter = std::vec::IntoIter<Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Links {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// All edges targeting one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub repo: RepoRef,
    pub links: Vec<Link>,
}

impl Group {
    pub fn new(repo: RepoRef) -> Self {
        Self {
            repo,
            links: Vec::new(),
        }
    }
}

/// Edges keyed by destination repository (`owner/name`).
///
/// Iteration is sorted by key; callers should not depend on the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Groups(BTreeMap<String, Group>);

impl Groups {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Group> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Group)> {
        self.0.iter()
    }
}

impl Index<&str> for Groups {
    type Output = Group;

    fn index(&self, key: &str) -> &Self::Output {
        &self.0[key]
    }
}

impl IntoIterator for Groups {
    type Item = (String, Group);
    type IntoIter = std::collections::btree_map::IntoIter<String, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Groups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, group) in &self.0 {
            writeln!(f, "{key}:")?;
            for link in &group.links {
                writeln!(f, "  {link}")?;
            }
        }
        Ok(())
    }
}
