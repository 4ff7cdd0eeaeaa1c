//! `stage-sync sync-back <staging_name> [...]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stagesync_core::SyncContext;
use stagesync_sync::{sync_back, Integration, SyncBackOptions, SystemGit};

/// Push staging changes and fast-forward the work repository.
#[derive(Args, Debug)]
pub struct SyncBackArgs {
    /// Staging directory name, relative to the staging root.
    pub staging_name: String,

    /// Work project path if it differs from the recorded one.
    #[arg(long, value_name = "NAME")]
    pub work_name: Option<String>,

    /// Branch to sync back. Defaults to the recorded branch, then the staging HEAD branch.
    #[arg(long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Explicit temporary branch name to use on the remote.
    #[arg(long, value_name = "NAME")]
    pub temp_branch: Option<String>,

    /// Switch the work repository to the target branch if needed.
    #[arg(long)]
    pub auto_checkout: bool,

    /// Hard-reset the work branch instead of fast-forwarding it, then force-push it.
    #[arg(long)]
    pub force: bool,

    /// Allow syncing while the staging repository has uncommitted changes.
    #[arg(long)]
    pub allow_dirty_stage: bool,

    /// Allow syncing while the work repository has uncommitted changes.
    #[arg(long)]
    pub allow_dirty_work: bool,
}

impl SyncBackArgs {
    pub fn run(self, ctx: &SyncContext) -> Result<()> {
        let opts = SyncBackOptions {
            work_name: self.work_name,
            branch: self.branch,
            temp_branch: self.temp_branch,
            auto_checkout: self.auto_checkout,
            force: self.force,
            allow_dirty_stage: self.allow_dirty_stage,
            allow_dirty_work: self.allow_dirty_work,
        };
        let outcome = sync_back(ctx, &SystemGit::new(), &self.staging_name, &opts)
            .with_context(|| format!("sync-back of '{}' failed", self.staging_name))?;

        let how = match outcome.integration {
            Integration::Created => "created",
            Integration::FastForward if !outcome.changed() => "already up to date",
            Integration::FastForward => "fast-forwarded",
            Integration::Reset => "reset",
        };
        println!(
            "{} '{}' → {} ({}): {} {}",
            "✓".green(),
            outcome.staging_id,
            outcome.work_path.display(),
            outcome.work_label,
            outcome.target_branch,
            how
        );
        println!("  {}/{} now at {}", ctx.remote, outcome.target_branch, outcome.new_head);
        Ok(())
    }
}
