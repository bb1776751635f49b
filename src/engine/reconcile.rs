//! engine::reconcile
//!
//! Per-link reconciliation against remote state.
//!
//! # Decision
//!
//! A link needs an update when the source content differs from the target
//! on the base branch *and* from the target on the head branch:
//!
//! 1. `from == to` on base: nothing to do, the head branch is not read
//! 2. target missing on head: update (creation)
//! 3. otherwise: update iff the head-side content differs
//!
//! The second step keeps repeated runs from rewriting content a previous
//! run already put on the head branch.

use crate::core::link::{HeadState, Link};
use crate::core::types::Branch;
use crate::forge::{FileFetcher, FileUpdater, RemoteFile, UpdateFileRequest};
use crate::ui::template::Formatter;

use super::LinkError;

impl Link {
    /// Fetch both sides.
    ///
    /// A missing target is fine: it will be created.
    ///
    /// # Errors
    ///
    /// - `Unresolved` if either side has no complete repository
    /// - `MissingSource` if the source cannot be fetched, for any reason
    /// - `Transport` if the target fetch fails with anything but not-found
    pub async fn populate<F>(&mut self, fetcher: &F) -> Result<(), LinkError>
    where
        F: FileFetcher + ?Sized,
    {
        if !self.from.repo.is_complete() || !self.to.repo.is_complete() {
            return Err(LinkError::Unresolved(self.to_string()));
        }

        let from = fetcher
            .get_file(&self.from)
            .await
            .map_err(|source| LinkError::MissingSource {
                file: self.from.to_string(),
                source,
            })?;
        from.populate(&mut self.from);

        match fetcher.get_file(&self.to).await {
            Ok(to) => to.populate(&mut self.to),
            Err(e) if e.is_not_found() => {
                tracing::debug!(file = %self.to, "target does not exist yet");
                self.to.content = None;
            }
            Err(e) => return Err(e.into()),
        }

        self.populated = true;
        Ok(())
    }

    /// Decide whether the target must be written on `head`.
    ///
    /// Records what the head branch holds in [`Link::head`].
    pub async fn need_update<F>(&mut self, fetcher: &F, head: &Branch) -> Result<bool, LinkError>
    where
        F: FileFetcher + ?Sized,
    {
        if self.from.content == self.to.content {
            self.head = HeadState::Unknown;
            return Ok(false);
        }

        let on_head = self.to.at_ref(head.name.as_str());
        match fetcher.get_file(&on_head).await {
            Ok(remote) => {
                let differs = self.from.content.as_deref() != Some(remote.content.as_str());
                tracing::debug!(file = %on_head, sha = %remote.sha, differs, "compared with head");
                self.head = HeadState::Present(remote.sha);
                Ok(differs)
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(file = %on_head, "missing on head");
                self.head = HeadState::Missing;
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copy the source content into the target on `head`.
    ///
    /// Writes against the blob observed on the head branch, creates the file
    /// when the head branch lacks it, and falls back to the base blob when
    /// the head was never checked.
    pub async fn update<U>(
        &mut self,
        updater: &U,
        formatter: &Formatter,
        head: &Branch,
    ) -> Result<RemoteFile, LinkError>
    where
        U: FileUpdater + ?Sized,
    {
        let content = self
            .from
            .content
            .clone()
            .ok_or_else(|| LinkError::Unpopulated(self.from.to_string()))?;
        self.to.content = Some(content.clone());

        let message = formatter.commit_message(self)?;

        let sha = match &self.head {
            HeadState::Present(sha) => Some(sha.clone()),
            HeadState::Missing => None,
            HeadState::Unknown if self.to.blob_sha.is_empty() => None,
            HeadState::Unknown => Some(self.to.blob_sha.clone()),
        };

        let written = updater
            .update_file(UpdateFileRequest {
                repo: self.to.repo.clone(),
                path: self.to.path.clone(),
                content,
                branch: head.name.clone(),
                message,
                sha,
            })
            .await?;

        self.to.blob_sha = written.sha.clone();
        if let Some(commit) = &written.commit {
            self.to.commit = commit.clone();
        }
        self.head = HeadState::Present(written.sha.clone());

        Ok(written)
    }
}
