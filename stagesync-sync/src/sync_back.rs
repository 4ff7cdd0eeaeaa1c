//! Sync-back: move staging commits into the work repository.
//!
//! ## Protocol
//!
//! 1. Resolve staging and work repositories.
//! 2. Cleanliness gate on each side (unless overridden).
//! 3. Pick the target branch.
//! 4. Remote-identity gate.
//! 5. Select the temporary branch.
//! 6. Publish staging HEAD to it (a [`TempBranchLease`] owns it from here).
//! 7. Fetch into work; create, fast-forward or reset the target branch.
//! 8. Push the target branch to the remote.
//! 9. Delete the temporary branch, whatever happened in 7–8.
//! 10. Record the mapping.
//!
//! Every check that can fail runs before step 6, so a rejected sync leaves the
//! remote untouched.

use std::path::{Path, PathBuf};

use stagesync_core::naming::TempBranchNamer;
use stagesync_core::{registry, ProjectMapping, StagingId, SyncContext};

use crate::error::SyncError;
use crate::git::{GitError, GitRunner};
use crate::lease::TempBranchLease;
use crate::repo::{remote_tracking_ref, Repo};
use crate::temp_branch::{self, Origin};

#[derive(Debug, Clone, Default)]
pub struct SyncBackOptions {
    /// Work project path under the work root; overrides the registry.
    pub work_name: Option<String>,
    /// Target branch in the work repository.
    pub branch: Option<String>,
    /// Explicit temporary branch; must not exist on the remote.
    pub temp_branch: Option<String>,
    pub auto_checkout: bool,
    /// Reset the target branch instead of fast-forwarding it and overwrite
    /// the remote target branch with the result.
    pub force: bool,
    pub allow_dirty_stage: bool,
    pub allow_dirty_work: bool,
}

/// How the work branch came to point at the staging commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// The branch did not exist in the work repository and was created.
    Created,
    FastForward,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBackOutcome {
    pub staging_id: StagingId,
    pub work_label: String,
    pub work_path: PathBuf,
    pub staging_path: PathBuf,
    pub target_branch: String,
    pub staging_branch: String,
    pub temp_branch: String,
    pub remote_url: String,
    pub integration: Integration,
    /// Work branch tip before integration; `None` when it was created.
    pub previous_head: Option<String>,
    pub new_head: String,
}

impl SyncBackOutcome {
    /// `false` when the work branch already pointed at the staging commit.
    pub fn changed(&self) -> bool {
        self.previous_head.as_deref() != Some(self.new_head.as_str())
    }
}

struct Transfer {
    integration: Integration,
    previous_head: Option<String>,
    new_head: String,
}

pub fn sync_back(
    ctx: &SyncContext,
    git: &dyn GitRunner,
    staging_name: &str,
    opts: &SyncBackOptions,
) -> Result<SyncBackOutcome, SyncError> {
    let remote = ctx.remote.as_str();

    // 1. Resolve locations.
    let staging_path = ctx.resolve_staging(Path::new(staging_name), "Staging path")?;
    let staging_id = ctx.staging_id_for(&staging_path)?;
    let staging = Repo::open(git, &staging_path, format!("Staging project {staging_id}"))?;

    let entry = registry::load_at(&ctx.config_path)?
        .get(&staging_id)
        .cloned();

    let (work_path, work_label) = match (&opts.work_name, &entry) {
        (Some(name), _) => (ctx.resolve_work(Path::new(name), "Work path")?, name.clone()),
        (None, Some(entry)) => (entry.work_path.clone(), entry.work_name.clone()),
        (None, None) => {
            let leaf = staging_id.leaf().to_owned();
            (ctx.resolve_work(Path::new(&leaf), "Work path")?, leaf)
        }
    };
    let work = Repo::open(git, &work_path, format!("Work project {work_label}"))?;

    // 2. Cleanliness gate.
    if !opts.allow_dirty_stage {
        staging.ensure_clean("--allow-dirty-stage")?;
    }
    if !opts.allow_dirty_work {
        work.ensure_clean("--allow-dirty-work")?;
    }

    // 3. Target branch.
    let staging_branch = staging.current_branch()?;
    let target_branch = opts
        .branch
        .clone()
        .or_else(|| entry.as_ref().and_then(|e| e.known_branch()).map(str::to_owned))
        .unwrap_or_else(|| staging_branch.clone());

    if let Some(requested) = &opts.branch {
        if requested != &staging_branch && !staging.local_branch_exists(requested)? {
            tracing::warn!(
                "staging repository has no local branch named {requested}; proceeding with the current HEAD ({staging_branch})"
            );
        }
    }

    // 4. Remote identity.
    let staging_url = staging.remote_url(remote)?;
    let work_url = work.remote_url(remote)?;
    if staging_url != work_url {
        return Err(SyncError::RemoteMismatch {
            work: work_url,
            staging: staging_url,
        });
    }
    if let Some(recorded) = entry.as_ref().and_then(|e| e.known_remote()) {
        if recorded != staging_url {
            return Err(SyncError::RecordedRemoteMismatch {
                id: staging_id.to_string(),
                recorded: recorded.to_owned(),
                actual: staging_url,
            });
        }
    }

    // 5. Temporary branch.
    let recorded = if opts.temp_branch.is_none() {
        entry.as_ref().and_then(|e| e.last_temp_branch.as_deref())
    } else {
        None
    };
    let mut namer = TempBranchNamer::new(&ctx.temp_prefix, staging_id.as_str(), &staging_branch);
    let selected = temp_branch::select(
        &staging,
        remote,
        opts.temp_branch.as_deref(),
        recorded,
        &mut namer,
    )?;
    if selected.origin == Origin::Recorded {
        tracing::info!("reusing recorded temporary branch {}", selected.name);
    }

    // 6. Publish.
    tracing::info!(
        "pushing staging HEAD ({staging_branch}) to temporary remote branch {}",
        selected.name
    );
    let lease = TempBranchLease::publish(&staging, &work, remote, &selected.name)?;

    // 7–8. Transfer, then 9. cleanup regardless of the outcome.
    let transferred = transfer(&work, remote, lease.branch(), &target_branch, opts);
    lease.release();
    let moved = transferred?;

    // 10. Record.
    let mapping = ProjectMapping {
        work_name: work_label.clone(),
        work_path: work_path.clone(),
        staging_path: staging_path.clone(),
        branch: target_branch.clone(),
        remote: staging_url.clone(),
        last_temp_branch: Some(selected.name.clone()),
        staging_branch: Some(staging_branch.clone()),
    };
    registry::upsert_at(&ctx.config_path, staging_id.clone(), mapping)?;

    tracing::info!(
        "sync complete: {} now contains {remote}/{target_branch} from staging",
        work_path.display()
    );

    Ok(SyncBackOutcome {
        staging_id,
        work_label,
        work_path,
        staging_path,
        target_branch,
        staging_branch,
        temp_branch: selected.name,
        remote_url: staging_url,
        integration: moved.integration,
        previous_head: moved.previous_head,
        new_head: moved.new_head,
    })
}

/// Steps 7 and 8. Runs while the temporary branch is leased.
fn transfer(
    work: &Repo<'_>,
    remote: &str,
    temp_branch: &str,
    target_branch: &str,
    opts: &SyncBackOptions,
) -> Result<Transfer, SyncError> {
    tracing::info!("fetching {temp_branch} into {}", work.path().display());
    work.fetch_branch(remote, temp_branch)?;
    let fetched = remote_tracking_ref(remote, temp_branch);
    let local_ref = format!("refs/heads/{target_branch}");

    let (integration, previous_head) = if !work.local_branch_exists(target_branch)? {
        tracing::info!("creating local branch {target_branch} from {remote}/{temp_branch}");
        work.create_branch(target_branch, &fetched)?;
        if opts.auto_checkout {
            work.checkout(target_branch)?;
        }
        (Integration::Created, None)
    } else {
        let current = work.current_branch()?;
        if current != target_branch {
            if !opts.auto_checkout {
                return Err(SyncError::WrongBranch {
                    current,
                    target: target_branch.to_owned(),
                });
            }
            tracing::info!("checking out branch {target_branch} in work repository");
            work.checkout(target_branch)?;
        }

        let previous = work.rev_parse(&local_ref)?;
        if opts.force {
            tracing::info!("hard resetting work branch {target_branch} to {remote}/{temp_branch}");
            work.reset_hard(&fetched)?;
            (Integration::Reset, Some(previous))
        } else {
            match work.merge_ff_only(&fetched) {
                Ok(out) => {
                    let out = out.trim();
                    if !out.is_empty() {
                        tracing::info!("{out}");
                    }
                }
                Err(err @ GitError::Failed { .. }) => {
                    return Err(SyncError::FastForward {
                        branch: target_branch.to_owned(),
                        upstream: format!("{remote}/{temp_branch}"),
                        output: err.output(),
                    });
                }
                Err(err) => return Err(err.into()),
            }
            (Integration::FastForward, Some(previous))
        }
    };

    let refspec = if opts.force {
        tracing::info!("force-pushing updated branch {target_branch} to {remote}");
        format!("+{local_ref}:{local_ref}")
    } else {
        tracing::info!("pushing updated branch {target_branch} to {remote}");
        format!("{local_ref}:{local_ref}")
    };
    work.push(remote, &refspec)?;

    Ok(Transfer {
        integration,
        previous_head,
        new_head: work.rev_parse(&local_ref)?,
    })
}

// ---------------------------------------------------------------------------
// Unit tests (scripted runner, no git required)
// ---------------------------------------------------------------------------
