//! Scoped ownership of a temporary branch on the shared remote.
//!
//! [`TempBranchLease::publish`] pushes a commit to the temporary branch and
//! returns a guard. Dropping the guard (or calling [`TempBranchLease::release`])
//! deletes the branch from the remote on every exit path, including early
//! returns through `?`. A failed deletion is logged and never turned into an
//! error. [`TempBranchLease::keep`] disarms the guard.

use crate::error::SyncError;
use crate::repo::Repo;

#[must_use = "dropping the lease deletes the temporary branch immediately"]
#[derive(Debug)]
pub struct TempBranchLease<'g> {
    releaser: Repo<'g>,
    remote: String,
    branch: String,
    armed: bool,
}

impl<'g> TempBranchLease<'g> {
    /// Force-push `publisher`'s HEAD to `refs/heads/<branch>` on `remote`.
    ///
    /// The branch belongs to this tool, so a recorded branch left at an older
    /// commit (one staging has since amended or rebased away) is overwritten.
    /// Nothing is leased if the push fails. `releaser` is the repository the
    /// deletion is issued from later.
    pub fn publish(
        publisher: &Repo<'_>,
        releaser: &Repo<'g>,
        remote: &str,
        branch: &str,
    ) -> Result<Self, SyncError> {
        publisher.push(remote, &format!("+HEAD:refs/heads/{branch}"))?;
        Ok(Self {
            releaser: releaser.clone(),
            remote: remote.to_owned(),
            branch: branch.to_owned(),
            armed: true,
        })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Leave the branch on the remote and return its name.
    pub fn keep(mut self) -> String {
        self.armed = false;
        std::mem::take(&mut self.branch)
    }

    /// Delete the branch now. Returns whether the deletion succeeded.
    pub fn release(mut self) -> bool {
        self.delete()
    }

    fn delete(&mut self) -> bool {
        if !self.armed {
            return true;
        }
        self.armed = false;
        tracing::info!("removing temporary remote branch {}", self.branch);
        match self.releaser.delete_remote_branch(&self.remote, &self.branch) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "failed to delete temporary branch {} from {}; remove it manually",
                    self.branch,
                    self.remote
                );
                false
            }
        }
    }
}

impl Drop for TempBranchLease<'_> {
    fn drop(&mut self) {
        self.delete();
    }
}
