//! engine::sync
//!
//! Group orchestration: one head branch and at most one pull request per
//! destination repository.
//!
//! Groups run one after another in key order. A failing group is recorded
//! in the [`SyncReport`] and the run moves on; cancellation stops the run
//! between or during groups.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::core::link::{Group, Groups, Link};
use crate::core::types::{Branch, BranchName, RepoRef};
use crate::forge::{CreatePullRequest, Forge, ForgeError, PullRequest};
use crate::ui::template::{Formatter, TemplateError};

use super::{LinkError, SyncError};

/// Default name of the head branch.
pub const DEFAULT_HEAD_BRANCH: &str = "auto-lnsync";

/// Settings of a synchronization run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Branch the updates are committed to in every destination repository.
    pub head_branch: BranchName,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            head_branch: BranchName::from_static(DEFAULT_HEAD_BRANCH),
        }
    }
}

/// How a group ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Nothing was written and the head branch this run created was deleted.
    CleanedUp,
    /// A pull request carries the head branch.
    PrReady {
        pull: PullRequest,
        /// The pull request was open before this run.
        existed: bool,
        /// Links written by this run.
        updated: usize,
    },
}

impl fmt::Display for GroupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOutcome::CleanedUp => write!(f, "up to date"),
            GroupOutcome::PrReady {
                pull,
                existed,
                updated,
            } => {
                let state = if *existed { "updated" } else { "opened" };
                write!(f, "#{} {} ({} file(s) written) {}", pull.number, state, updated, pull.url)
            }
        }
    }
}

/// Result of one group.
#[derive(Debug, Clone)]
pub struct GroupReport {
    pub repo: RepoRef,
    pub links: usize,
    pub result: Result<GroupOutcome, SyncError>,
}

/// Result of a run, one entry per processed group.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub groups: Vec<GroupReport>,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.groups.iter().filter(|g| g.result.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Turn a report with failed groups into [`SyncError::GroupsFailed`].
    pub fn into_result(self) -> Result<Self, SyncError> {
        match self.failed() {
            0 => Ok(self),
            failed => Err(SyncError::GroupsFailed {
                failed,
                total: self.groups.len(),
            }),
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            match &group.result {
                Ok(outcome) => writeln!(f, "{}: {}", group.repo, outcome)?,
                Err(e) => writeln!(f, "{}: failed: {}", group.repo, e)?,
            }
        }
        Ok(())
    }
}

/// Runs groups of links against a forge.
pub struct Synchronizer<'a, F: Forge + ?Sized> {
    forge: &'a F,
    formatter: &'a Formatter,
    settings: SyncSettings,
}

impl<'a, F: Forge + ?Sized> Synchronizer<'a, F> {
    pub fn new(forge: &'a F, formatter: &'a Formatter, settings: SyncSettings) -> Self {
        Self {
            forge,
            formatter,
            settings,
        }
    }

    /// Synchronize every group.
    ///
    /// Group failures end up in the report. Only cancellation fails the run
    /// itself.
    pub async fn run(
        &self,
        groups: Groups,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let total = groups.len();
        let mut report = SyncReport::default();

        tracing::info!(groups = total, forge = self.forge.name(), "starting synchronization");

        for (key, mut group) in groups {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled {
                    processed: report.groups.len(),
                    total,
                });
            }

            let span = tracing::info_span!("group", repo = %key);
            let result = tokio::select! {
                result = self.sync_group(&mut group).instrument(span) => result,
                _ = cancel.cancelled() => {
                    return Err(SyncError::Cancelled {
                        processed: report.groups.len(),
                        total,
                    });
                }
            };

            match &result {
                Ok(outcome) => tracing::info!(repo = %key, "{}", outcome),
                Err(e) => tracing::error!(repo = %key, "{}", e),
            }

            report.groups.push(GroupReport {
                repo: group.repo,
                links: group.links.len(),
                result,
            });
        }

        Ok(report)
    }

    /// Synchronize one group.
    ///
    /// NoBranch -> HeadReady -> Reconciling -> CleanedUp | PrReady.
    pub async fn sync_group(&self, group: &mut Group) -> Result<GroupOutcome, SyncError> {
        let repo = group.repo.clone();
        let branch_error = |source: ForgeError| SyncError::Branch {
            repo: repo.to_string(),
            source,
        };

        let base = self
            .forge
            .default_branch(&repo)
            .await
            .map_err(branch_error)?;
        let head = self
            .forge
            .get_or_create_branch(&repo, self.settings.head_branch.as_str(), &base.commit_sha)
            .await
            .map_err(branch_error)?;
        tracing::debug!(base = %base, head = %head, "head branch ready");

        let mut updated = 0;
        for link in &mut group.links {
            let name = link.to_string();
            match self.reconcile(link, &head).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(source) => {
                    if updated == 0 && head.is_new {
                        self.discard_head(&repo, &head).await;
                    }
                    return Err(SyncError::Link { link: name, source });
                }
            }
        }

        // A head branch still at the base commit carries nothing to review,
        // whether this run created it or an interrupted run left it behind.
        if updated == 0 && (head.is_new || head.commit_sha == base.commit_sha) {
            self.forge
                .delete_branch(&repo, &head.name)
                .await
                .map_err(branch_error)?;
            tracing::debug!(head = %head.name, "nothing written, deleted head branch");
            return Ok(GroupOutcome::CleanedUp);
        }

        let render_error = |source: TemplateError| SyncError::Render {
            repo: repo.to_string(),
            source,
        };
        let request = CreatePullRequest {
            base: base.name.clone(),
            head: head.name.clone(),
            title: self.formatter.pull_title(group).map_err(render_error)?,
            body: self.formatter.pull_body(group).map_err(render_error)?,
        };

        let (pull, existed) = self
            .forge
            .get_or_create_pull(&repo, request)
            .await
            .map_err(|source| SyncError::Pull {
                repo: repo.to_string(),
                source,
            })?;

        Ok(GroupOutcome::PrReady {
            pull,
            existed,
            updated,
        })
    }

    /// Delete a head branch after a failed group. Failures are logged only;
    /// the group error is what gets reported.
    async fn discard_head(&self, repo: &RepoRef, head: &Branch) {
        match self.forge.delete_branch(repo, &head.name).await {
            Ok(()) => tracing::debug!(head = %head.name, "group failed, deleted new head branch"),
            Err(e) => tracing::warn!(head = %head.name, error = %e, "failed to delete head branch"),
        }
    }

    /// Bring one link up to date on `head`. Returns whether it was written.
    async fn reconcile(&self, link: &mut Link, head: &Branch) -> Result<bool, LinkError> {
        if !link.populated {
            link.populate(self.forge).await?;
        }

        if !link.need_update(self.forge, head).await? {
            tracing::info!(link = %link, "up to date");
            return Ok(false);
        }

        let written = link.update(self.forge, self.formatter, head).await?;
        tracing::info!(link = %link, sha = %written.sha, "updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::Links;
    use crate::core::types::FileRef;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};

    const HEAD: &str = DEFAULT_HEAD_BRANCH;

    fn src() -> RepoRef {
        RepoRef::new("o", "src")
    }

    fn dst(name: &str) -> RepoRef {
        RepoRef::new("o", name)
    }

    fn groups(pairs: &[(&str, &str, &RepoRef, &str)]) -> Groups {
        pairs
            .iter()
            .map(|(from_repo, from, to_repo, to)| {
                Link::new(
                    FileRef::new(RepoRef::new("o", *from_repo), *from),
                    FileRef::new((*to_repo).clone(), *to),
                )
            })
            .collect::<Links>()
            .groups()
    }

    async fn run(forge: &MockForge, groups: Groups) -> SyncReport {
        let formatter = Formatter::default();
        Synchronizer::new(forge, &formatter, SyncSettings::default())
            .run(groups, &CancellationToken::new())
            .await
            .unwrap()
    }

    fn pull_creations(forge: &MockForge) -> usize {
        forge
            .operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::CreatePull { .. }))
            .count()
    }

    #[test]
    fn default_head_branch_is_valid() {
        let name = BranchName::new(DEFAULT_HEAD_BRANCH).unwrap();
        assert_eq!(SyncSettings::default().head_branch, name);
    }

    #[tokio::test]
    async fn writes_changes_and_opens_one_pull_per_group() {
        let (a, b) = (dst("a"), dst("b"));
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "X")
            .with_file(&src(), "y.md", "Y")
            .with_repo(&a, "main")
            .with_file(&b, "x.md", "old");

        let report = run(
            &forge,
            groups(&[
                ("src", "x.md", &a, "x.md"),
                ("src", "y.md", &a, "y.md"),
                ("src", "x.md", &b, "x.md"),
            ]),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].repo, a);
        assert_eq!(report.groups[0].links, 2);

        assert_eq!(forge.file_content(&a, HEAD, "x.md").as_deref(), Some("X"));
        assert_eq!(forge.file_content(&a, HEAD, "y.md").as_deref(), Some("Y"));
        assert_eq!(forge.file_content(&b, HEAD, "x.md").as_deref(), Some("X"));
        assert_eq!(forge.file_content(&b, "main", "x.md").as_deref(), Some("old"));

        assert_eq!(forge.pulls(&a).len(), 1);
        assert_eq!(forge.pulls(&b).len(), 1);
        assert_eq!(pull_creations(&forge), 2);

        let Ok(GroupOutcome::PrReady { updated, existed, .. }) = &report.groups[0].result else {
            panic!("expected a pull request, got {:?}", report.groups[0].result);
        };
        assert_eq!(*updated, 2);
        assert!(!existed);
    }

    #[tokio::test]
    async fn nothing_to_do_deletes_new_head_branch() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "same")
            .with_file(&a, "x.md", "same");

        let report = run(&forge, groups(&[("src", "x.md", &a, "x.md")])).await;

        assert_eq!(report.groups[0].result, Ok(GroupOutcome::CleanedUp));
        assert!(!forge.has_branch(&a, HEAD));
        assert!(forge.pulls(&a).is_empty());
        assert_eq!(pull_creations(&forge), 0);
    }

    #[tokio::test]
    async fn second_run_reuses_branch_and_pull() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "X")
            .with_repo(&a, "main");
        let links = [("src", "x.md", &a, "x.md")];

        run(&forge, groups(&links)).await;
        forge.clear_operations();
        let report = run(&forge, groups(&links)).await;

        let Ok(GroupOutcome::PrReady { updated, existed, .. }) = &report.groups[0].result else {
            panic!("expected a pull request, got {:?}", report.groups[0].result);
        };
        assert_eq!(*updated, 0);
        assert!(existed);

        let ops = forge.operations();
        assert!(!ops.iter().any(|op| matches!(op, MockOperation::UpdateFile { .. })));
        assert!(!ops.iter().any(|op| matches!(op, MockOperation::CreateBranch { .. })));
        assert_eq!(pull_creations(&forge), 0);
        assert_eq!(forge.pulls(&a).len(), 1);
    }

    #[tokio::test]
    async fn existing_head_branch_is_kept_without_changes() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "same")
            .with_file(&a, "x.md", "same")
            .with_file_on(&a, HEAD, "y.md", "earlier run");

        let report = run(&forge, groups(&[("src", "x.md", &a, "x.md")])).await;

        assert!(matches!(
            report.groups[0].result,
            Ok(GroupOutcome::PrReady { updated: 0, .. })
        ));
        assert!(forge.has_branch(&a, HEAD));
    }

    #[tokio::test]
    async fn leftover_head_branch_at_base_is_deleted() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "same")
            .with_file(&a, "x.md", "same")
            .with_branch(&a, HEAD);

        let report = run(&forge, groups(&[("src", "x.md", &a, "x.md")])).await;

        assert_eq!(report.groups[0].result, Ok(GroupOutcome::CleanedUp));
        assert!(!forge.has_branch(&a, HEAD));
        assert_eq!(pull_creations(&forge), 0);
    }

    #[tokio::test]
    async fn failing_group_does_not_stop_others() {
        let (a, b) = (dst("a"), dst("b"));
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "X")
            .with_repo(&a, "main")
            .with_repo(&b, "main")
            .fail_on_repo(&a, FailOn::DefaultBranch(ForgeError::RateLimited));

        let report = run(
            &forge,
            groups(&[("src", "x.md", &a, "x.md"), ("src", "x.md", &b, "x.md")]),
        )
        .await;

        assert_eq!(report.failed(), 1);
        assert!(matches!(report.groups[0].result, Err(SyncError::Branch { .. })));
        assert!(report.groups[1].result.is_ok());
        assert_eq!(forge.file_content(&b, HEAD, "x.md").as_deref(), Some("X"));

        assert_eq!(
            report.into_result().unwrap_err(),
            SyncError::GroupsFailed { failed: 1, total: 2 }
        );
    }

    #[tokio::test]
    async fn missing_source_fails_group() {
        let a = dst("a");
        let forge = MockForge::new().with_repo(&src(), "main").with_repo(&a, "main");

        let report = run(&forge, groups(&[("src", "gone.md", &a, "x.md")])).await;

        let Err(SyncError::Link { source, .. }) = &report.groups[0].result else {
            panic!("expected a link failure, got {:?}", report.groups[0].result);
        };
        assert!(matches!(source, LinkError::MissingSource { .. }));
        assert!(forge.pulls(&a).is_empty());
        assert!(!forge.has_branch(&a, HEAD));
    }

    #[tokio::test]
    async fn failed_group_leaves_nothing_for_the_next_run() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "same")
            .with_file(&a, "x.md", "same");

        let report = run(
            &forge,
            groups(&[("src", "x.md", &a, "x.md"), ("src", "gone.md", &a, "y.md")]),
        )
        .await;
        assert!(matches!(report.groups[0].result, Err(SyncError::Link { .. })));
        assert!(!forge.has_branch(&a, HEAD));

        let report = run(&forge, groups(&[("src", "x.md", &a, "x.md")])).await;

        assert_eq!(report.groups[0].result, Ok(GroupOutcome::CleanedUp));
        assert_eq!(pull_creations(&forge), 0);
    }

    #[tokio::test]
    async fn failed_head_cleanup_keeps_the_link_error() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_repo(&src(), "main")
            .with_repo(&a, "main")
            .fail_on(FailOn::DeleteBranch(ForgeError::RateLimited));

        let report = run(&forge, groups(&[("src", "gone.md", &a, "x.md")])).await;

        assert!(matches!(report.groups[0].result, Err(SyncError::Link { .. })));
    }

    #[tokio::test]
    async fn head_branch_with_writes_is_kept_on_failure() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "X")
            .with_repo(&a, "main");

        let report = run(
            &forge,
            groups(&[("src", "x.md", &a, "x.md"), ("src", "gone.md", &a, "y.md")]),
        )
        .await;

        assert!(report.groups[0].result.is_err());
        assert_eq!(forge.file_content(&a, HEAD, "x.md").as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn pull_conflict_without_open_pull_fails_group() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "X")
            .with_repo(&a, "main")
            .fail_once(FailOn::CreatePull(ForgeError::AlreadyExists("pull".into())));

        let report = run(&forge, groups(&[("src", "x.md", &a, "x.md")])).await;

        assert!(matches!(
            report.groups[0].result,
            Err(SyncError::Pull { source: ForgeError::AlreadyExists(_), .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let a = dst("a");
        let forge = MockForge::new().with_file(&src(), "x.md", "X");
        let formatter = Formatter::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Synchronizer::new(&forge, &formatter, SyncSettings::default())
            .run(groups(&[("src", "x.md", &a, "x.md")]), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, SyncError::Cancelled { processed: 0, total: 1 });
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn custom_head_branch() {
        let a = dst("a");
        let forge = MockForge::new()
            .with_file(&src(), "x.md", "X")
            .with_repo(&a, "main");
        let formatter = Formatter::default();
        let settings = SyncSettings {
            head_branch: BranchName::new("sync/docs").unwrap(),
        };

        Synchronizer::new(&forge, &formatter, settings)
            .run(groups(&[("src", "x.md", &a, "x.md")]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(forge.file_content(&a, "sync/docs", "x.md").as_deref(), Some("X"));
        assert_eq!(forge.pulls(&a)[0].head, "sync/docs");
    }

    #[test]
    fn report_display() {
        let report = SyncReport {
            groups: vec![
                GroupReport {
                    repo: dst("a"),
                    links: 1,
                    result: Ok(GroupOutcome::CleanedUp),
                },
                GroupReport {
                    repo: dst("b"),
                    links: 1,
                    result: Err(SyncError::Cancelled { processed: 0, total: 1 }),
                },
            ],
        };
        assert_eq!(
            report.to_string(),
            "o/a: up to date\no/b: failed: cancelled after 0 of 1 groups\n"
        );
    }
}
