//! `stage-sync clone <project> [--as-name NAME] [--temp-branch NAME] [--force]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stagesync_core::SyncContext;
use stagesync_sync::{clone_project, CloneOptions, SystemGit};

/// Prepare a staging repository for a project.
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Project path, relative to the work root.
    pub project: String,

    /// Name for the staging copy. Defaults to the project's directory name.
    #[arg(long, value_name = "NAME")]
    pub as_name: Option<String>,

    /// Temporary remote branch to create. Defaults to a generated name.
    #[arg(long, value_name = "NAME")]
    pub temp_branch: Option<String>,

    /// Replace the staging directory if it already exists.
    #[arg(long)]
    pub force: bool,
}

impl CloneArgs {
    pub fn run(self, ctx: &SyncContext) -> Result<()> {
        let opts = CloneOptions {
            as_name: self.as_name,
            temp_branch: self.temp_branch,
            force: self.force,
        };
        let outcome = clone_project(ctx, &SystemGit::new(), &self.project, &opts)
            .with_context(|| format!("clone of '{}' failed", self.project))?;

        println!(
            "{} Staging repository '{}' ready at {}",
            "✓".green(),
            outcome.staging_id,
            outcome.staging_path.display()
        );
        println!(
            "  Local branch {} tracks {}/{} (branched from {})",
            outcome.branch, ctx.remote, outcome.temp_branch, outcome.branch
        );
        if outcome.bootstrapped {
            println!("  Pushed {} to {} first (it was missing there)", outcome.branch, ctx.remote);
        }
        Ok(())
    }
}
