//! Typed git operations on one repository.
//!
//! [`Repo`] pairs a [`GitRunner`] with a path and a human label used in error
//! messages. Read operations are captured; mutations that talk to the remote
//! are streamed so the operator sees git's own progress output.

use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::git::{GitError, GitRunner, OutputMode};

#[derive(Clone)]
pub struct Repo<'g> {
    git: &'g dyn GitRunner,
    path: PathBuf,
    label: String,
}

impl std::fmt::Debug for Repo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("path", &self.path)
            .field("label", &self.label)
            .finish()
    }
}

/// `refs/remotes/<remote>/<branch>`
pub fn remote_tracking_ref(remote: &str, branch: &str) -> String {
    format!("refs/remotes/{remote}/{branch}")
}

impl<'g> Repo<'g> {
    /// Wrap `path` without any checks. Used for repositories about to be created.
    pub fn new(git: &'g dyn GitRunner, path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            git,
            path: path.into(),
            label: label.into(),
        }
    }

    /// Wrap an existing repository: `path` must be a directory containing `.git`.
    pub fn open(
        git: &'g dyn GitRunner,
        path: impl Into<PathBuf>,
        label: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let repo = Self::new(git, path, label);
        if !repo.path.exists() {
            return Err(SyncError::MissingPath {
                label: repo.label,
                path: repo.path,
            });
        }
        if !repo.path.is_dir() {
            return Err(SyncError::NotADirectory {
                label: repo.label,
                path: repo.path,
            });
        }
        if !repo.path.join(".git").exists() {
            return Err(SyncError::NotARepository {
                label: repo.label,
                path: repo.path,
            });
        }
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn captured(&self, args: &[&str]) -> Result<String, GitError> {
        self.git.run(&self.path, args, OutputMode::Captured)
    }

    fn streamed(&self, args: &[&str]) -> Result<(), GitError> {
        self.git.run(&self.path, args, OutputMode::Streamed).map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Symbolic branch of HEAD; [`SyncError::DetachedHead`] when there is none.
    pub fn current_branch(&self) -> Result<String, SyncError> {
        match self.captured(&["symbolic-ref", "--quiet", "--short", "HEAD"]) {
            Ok(out) => {
                let branch = out.trim();
                if branch.is_empty() {
                    Err(SyncError::DetachedHead {
                        label: self.label.clone(),
                    })
                } else {
                    Ok(branch.to_owned())
                }
            }
            Err(GitError::Failed { .. }) => Err(SyncError::DetachedHead {
                label: self.label.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn remote_url(&self, remote: &str) -> Result<String, SyncError> {
        match self.captured(&["remote", "get-url", remote]) {
            Ok(out) => Ok(out.trim().to_owned()),
            Err(err @ GitError::Failed { .. }) => Err(SyncError::MissingRemote {
                path: self.path.clone(),
                remote: remote.to_owned(),
                output: err.output(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_clean(&self) -> Result<bool, SyncError> {
        Ok(self.captured(&["status", "--porcelain"])?.trim().is_empty())
    }

    /// [`SyncError::DirtyTree`] naming `override_flag` as the way out.
    pub fn ensure_clean(&self, override_flag: &'static str) -> Result<(), SyncError> {
        if self.is_clean()? {
            Ok(())
        } else {
            Err(SyncError::DirtyTree {
                label: self.label.clone(),
                flag: override_flag,
            })
        }
    }

    /// Exact-match lookup of `refs/heads/<branch>` on the remote.
    pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, SyncError> {
        let wanted = format!("refs/heads/{branch}");
        let out = self.captured(&["ls-remote", "--heads", remote, &wanted])?;
        Ok(out
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .any(|name| name == wanted))
    }

    pub fn local_branch_exists(&self, branch: &str) -> Result<bool, SyncError> {
        let full = format!("refs/heads/{branch}");
        match self.captured(&["show-ref", "--verify", "--quiet", &full]) {
            Ok(_) => Ok(true),
            Err(GitError::Failed { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Commit id that `rev` points at.
    pub fn rev_parse(&self, rev: &str) -> Result<String, SyncError> {
        Ok(self.captured(&["rev-parse", "--verify", rev])?.trim().to_owned())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn push(&self, remote: &str, refspec: &str) -> Result<(), SyncError> {
        Ok(self.streamed(&["push", remote, refspec])?)
    }

    /// `push -u <remote> <branch>:<branch>`
    pub fn push_set_upstream(&self, remote: &str, branch: &str) -> Result<(), SyncError> {
        let refspec = format!("{branch}:{branch}");
        Ok(self.streamed(&["push", "-u", remote, &refspec])?)
    }

    /// Delete `refs/heads/<branch>` on the remote by pushing an empty source.
    pub fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<(), SyncError> {
        let refspec = format!(":refs/heads/{branch}");
        Ok(self.streamed(&["push", remote, &refspec])?)
    }

    /// Fetch one branch into its remote-tracking ref.
    pub fn fetch_branch(&self, remote: &str, branch: &str) -> Result<(), SyncError> {
        let refspec = format!(
            "+refs/heads/{branch}:{}",
            remote_tracking_ref(remote, branch)
        );
        Ok(self.streamed(&["fetch", remote, &refspec])?)
    }

    /// Create `name` at `start` without switching to it.
    pub fn create_branch(&self, name: &str, start: &str) -> Result<(), SyncError> {
        self.captured(&["branch", "--no-track", name, start])?;
        Ok(())
    }

    pub fn checkout(&self, branch: &str) -> Result<(), SyncError> {
        Ok(self.streamed(&["checkout", branch])?)
    }

    /// `checkout -B <local> --track <upstream>`
    pub fn checkout_tracking(&self, local: &str, upstream: &str) -> Result<(), SyncError> {
        Ok(self.streamed(&["checkout", "-B", local, "--track", upstream])?)
    }

    pub fn reset_hard(&self, rev: &str) -> Result<(), SyncError> {
        Ok(self.streamed(&["reset", "--hard", rev])?)
    }

    /// `merge --ff-only <rev>`, captured so diagnostics can be reported.
    pub fn merge_ff_only(&self, rev: &str) -> Result<String, GitError> {
        self.captured(&["merge", "--ff-only", rev])
    }

    pub fn init(&self) -> Result<(), SyncError> {
        Ok(self.streamed(&["init"])?)
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), SyncError> {
        self.captured(&["remote", "add", name, url])?;
        Ok(())
    }
}
