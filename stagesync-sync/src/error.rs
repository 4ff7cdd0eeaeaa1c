//! Error types for stagesync-sync.

use std::path::PathBuf;

use thiserror::Error;

use stagesync_core::{ConfigError, RegistryError};

use crate::git::GitError;

/// All errors that can arise from clone and sync-back.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Git(#[from] GitError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{label} {path} does not exist")]
    MissingPath { label: String, path: PathBuf },

    #[error("{label} {path} is not a directory")]
    NotADirectory { label: String, path: PathBuf },

    #[error("{label} {path} does not look like a git repository (missing .git)")]
    NotARepository { label: String, path: PathBuf },

    #[error("{label} is in a detached HEAD state. Check out a branch first.")]
    DetachedHead { label: String },

    #[error("repository {path} does not have a remote named {remote}{}", trailer(.output))]
    MissingRemote {
        path: PathBuf,
        remote: String,
        output: String,
    },

    #[error("{label} has uncommitted changes. Commit or stash them, or re-run with {flag}.")]
    DirtyTree { label: String, flag: &'static str },

    #[error("work repository remote URL does not match staging remote URL.\nWork:    {work}\nStaging: {staging}")]
    RemoteMismatch { work: String, staging: String },

    #[error("registry records remote {recorded} for '{id}' but the repositories use {actual}. Update or re-clone the mapping.")]
    RecordedRemoteMismatch {
        id: String,
        recorded: String,
        actual: String,
    },

    #[error("target staging directory {path} already exists. Use --force to replace it.")]
    TargetExists { path: PathBuf },

    #[error("refusing to remove {path}: it contains the source project")]
    SelfDestruct { path: PathBuf },

    #[error("temporary branch {branch} already exists on {remote}. Provide --temp-branch with a different name or delete it manually.")]
    TempBranchExists { branch: String, remote: String },

    #[error("could not find a free temporary branch name on {remote} after {attempts} attempts (last tried {last})")]
    TempBranchExhausted {
        remote: String,
        attempts: usize,
        last: String,
    },

    #[error("work repository is on branch {current}. Use --auto-checkout to switch automatically or check out {target} manually.")]
    WrongBranch { current: String, target: String },

    #[error("unable to fast-forward work branch {branch} to {upstream}.\ngit merge output:\n{output}")]
    FastForward {
        branch: String,
        upstream: String,
        output: String,
    },
}

fn trailer(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\nGit output:\n{trimmed}")
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
