//! Choosing the temporary branch for one clone or sync-back.

use stagesync_core::naming::{TempBranchNamer, MAX_TEMP_BRANCH_ATTEMPTS};

use crate::error::SyncError;
use crate::repo::Repo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Supplied by the caller; a remote collision is fatal.
    Explicit,
    /// Taken from the registry; reused without a collision check.
    Recorded,
    /// Produced by the namer; collisions regenerate.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selected {
    pub name: String,
    pub origin: Origin,
}

/// Explicit beats recorded beats generated.
pub(crate) fn select(
    repo: &Repo<'_>,
    remote: &str,
    explicit: Option<&str>,
    recorded: Option<&str>,
    namer: &mut TempBranchNamer,
) -> Result<Selected, SyncError> {
    if let Some(name) = explicit {
        if repo.remote_branch_exists(remote, name)? {
            return Err(SyncError::TempBranchExists {
                branch: name.to_owned(),
                remote: remote.to_owned(),
            });
        }
        return Ok(Selected {
            name: name.to_owned(),
            origin: Origin::Explicit,
        });
    }

    if let Some(name) = recorded {
        tracing::debug!("reusing recorded temporary branch {name}");
        return Ok(Selected {
            name: name.to_owned(),
            origin: Origin::Recorded,
        });
    }

    let mut last = String::new();
    for attempt in 1..=MAX_TEMP_BRANCH_ATTEMPTS {
        let candidate = namer.next_candidate();
        if !repo.remote_branch_exists(remote, &candidate)? {
            return Ok(Selected {
                name: candidate,
                origin: Origin::Generated,
            });
        }
        tracing::debug!(attempt, "temporary branch {candidate} already on {remote}, regenerating");
        last = candidate;
    }
    Err(SyncError::TempBranchExhausted {
        remote: remote.to_owned(),
        attempts: MAX_TEMP_BRANCH_ATTEMPTS,
        last,
    })
}
