//! Clone: create a staging repository from a work project.
//!
//! The staging copy is never made by copying files or by a direct
//! repository-to-repository fetch. The work HEAD is pushed to a temporary
//! branch on the shared remote and the new repository fetches it from there.

use std::path::{Path, PathBuf};

use stagesync_core::naming::TempBranchNamer;
use stagesync_core::{registry, ProjectMapping, StagingId, SyncContext};

use crate::error::{io_err, SyncError};
use crate::git::GitRunner;
use crate::lease::TempBranchLease;
use crate::repo::Repo;
use crate::temp_branch;

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Staging directory name; defaults to the project's last path segment.
    pub as_name: Option<String>,
    /// Explicit temporary branch; must not exist on the remote.
    pub temp_branch: Option<String>,
    /// Replace an existing staging directory.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    pub staging_id: StagingId,
    pub source_path: PathBuf,
    pub staging_path: PathBuf,
    pub branch: String,
    pub temp_branch: String,
    pub remote_url: String,
    /// The base branch was missing on the remote and had to be pushed first.
    pub bootstrapped: bool,
    /// An existing staging directory was removed.
    pub replaced: bool,
}

pub fn clone_project(
    ctx: &SyncContext,
    git: &dyn GitRunner,
    project: &str,
    opts: &CloneOptions,
) -> Result<CloneOutcome, SyncError> {
    let remote = ctx.remote.as_str();
    ctx.ensure_work_root()?;

    let project_rel = Path::new(project);
    let source_path = ctx.resolve_work(project_rel, "Project path")?;
    let source = Repo::open(
        git,
        &source_path,
        format!("Source project {}", source_path.display()),
    )?;

    let branch = source.current_branch()?;
    let remote_url = source.remote_url(remote)?;

    let target_name = match &opts.as_name {
        Some(name) => PathBuf::from(name),
        None => project_rel
            .file_name()
            .or_else(|| source_path.file_name())
            .map(PathBuf::from)
            .ok_or_else(|| SyncError::MissingPath {
                label: "Project path".to_owned(),
                path: project_rel.to_path_buf(),
            })?,
    };
    let target = ctx.resolve_staging(&target_name, "Staging target")?;
    let staging_id = ctx.staging_id_for(&target)?;

    let replaced = target.exists();
    if replaced {
        if !opts.force {
            return Err(SyncError::TargetExists { path: target });
        }
        if source_path.starts_with(&target) {
            return Err(SyncError::SelfDestruct { path: target });
        }
    }

    let mut namer = TempBranchNamer::new(&ctx.temp_prefix, staging_id.as_str(), &branch);
    let selected = temp_branch::select(
        &source,
        remote,
        opts.temp_branch.as_deref(),
        None,
        &mut namer,
    )?;

    // Remote mutations start here.
    let bootstrapped = !source.remote_branch_exists(remote, &branch)?;
    if bootstrapped {
        tracing::info!("remote branch {branch} not found on {remote}; pushing current branch before cloning");
        source.push_set_upstream(remote, &branch)?;
    }

    if replaced {
        tracing::info!("removing existing staging directory {}", target.display());
        std::fs::remove_dir_all(&target).map_err(|e| io_err(&target, e))?;
    }

    tracing::info!(
        "creating temporary remote branch {} from {branch} in {}",
        selected.name,
        source_path.display()
    );
    let lease = TempBranchLease::publish(&source, &source, remote, &selected.name)?;

    tracing::info!(
        "initializing staging repository at {} from remote branch {}",
        target.display(),
        selected.name
    );
    if let Err(err) = init_staging(git, &target, remote, &remote_url, &branch, lease.branch()) {
        if target.exists() {
            if let Err(rm) = std::fs::remove_dir_all(&target) {
                tracing::warn!(error = %rm, "could not remove partial staging directory {}", target.display());
            }
        }
        return Err(err);
    }
    // The staging branch tracks the temporary branch, so it stays on the remote.
    let temp_branch = lease.keep();

    let mapping = ProjectMapping {
        work_name: project.to_owned(),
        work_path: source_path.clone(),
        staging_path: target.clone(),
        branch: branch.clone(),
        remote: remote_url.clone(),
        last_temp_branch: Some(temp_branch.clone()),
        staging_branch: Some(branch.clone()),
    };
    registry::upsert_at(&ctx.config_path, staging_id.clone(), mapping)?;

    tracing::info!(
        "staging repository ready: local branch {branch} tracks {remote}/{temp_branch}"
    );

    Ok(CloneOutcome {
        staging_id,
        source_path,
        staging_path: target,
        branch,
        temp_branch,
        remote_url,
        bootstrapped,
        replaced,
    })
}

/// `init`, add the remote, fetch the temporary branch and check out `branch` tracking it.
fn init_staging(
    git: &dyn GitRunner,
    target: &Path,
    remote: &str,
    remote_url: &str,
    branch: &str,
    temp_branch: &str,
) -> Result<(), SyncError> {
    std::fs::create_dir_all(target).map_err(|e| io_err(target, e))?;
    let staging = Repo::new(git, target, format!("Staging project {}", target.display()));
    staging.init()?;
    staging.add_remote(remote, remote_url)?;
    staging.fetch_branch(remote, temp_branch)?;
    staging.checkout_tracking(branch, &format!("{remote}/{temp_branch}"))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
