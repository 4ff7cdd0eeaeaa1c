//! stage-sync: staging copies of local git projects, synced through a shared remote.
//!
//! # Usage
//!
//! ```text
//! stage-sync --work-root <PATH> [--staging-root <PATH>] [--config-path <PATH>] [--remote <NAME>] <COMMAND>
//!
//! stage-sync clone <project> [--as-name NAME] [--temp-branch NAME] [--force]
//! stage-sync sync-back <staging_name> [--work-name NAME] [--branch NAME] [--temp-branch NAME]
//!                      [--auto-checkout] [--force] [--allow-dirty-stage] [--allow-dirty-work]
//! stage-sync list [--json]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{clone::CloneArgs, list::ListArgs, sync_back::SyncBackArgs};
use stagesync_core::{context::DEFAULT_REMOTE, SyncContext};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stage-sync",
    version,
    about = "Manage staging copies of local git projects using a shared remote",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare a staging repository for a project.
    Clone(CloneArgs),

    /// Push staging changes and fast-forward the work repository.
    SyncBack(SyncBackArgs),

    /// List known staging/work mappings.
    List(ListArgs),
}

/// Locations shared by every subcommand.
#[derive(Args, Debug)]
struct GlobalArgs {
    /// Staging root directory. Defaults to the current working directory.
    #[arg(long, global = true, value_name = "PATH", env = "STAGESYNC_STAGING_ROOT")]
    staging_root: Option<PathBuf>,

    /// Work directory that contains your source repositories.
    #[arg(long, global = true, value_name = "PATH", env = "STAGESYNC_WORK_ROOT")]
    work_root: Option<PathBuf>,

    /// Metadata JSON file. Defaults to <staging-root>/.staging_sync.json.
    #[arg(long, global = true, value_name = "PATH", env = "STAGESYNC_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Name of the shared remote in both repositories.
    #[arg(long, global = true, value_name = "NAME", default_value = DEFAULT_REMOTE)]
    remote: String,
}

impl GlobalArgs {
    fn context(self) -> Result<SyncContext> {
        let ctx = SyncContext::new(self.staging_root, self.work_root, self.config_path)?;
        Ok(ctx.with_remote(self.remote))
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let ctx = cli.global.context()?;
    tracing::debug!(
        staging_root = %ctx.staging_root.display(),
        work_root = %ctx.work_root.display(),
        config = %ctx.config_path.display(),
        remote = %ctx.remote,
        "resolved locations"
    );
    match cli.command {
        Commands::Clone(args) => args.run(&ctx),
        Commands::SyncBack(args) => args.run(&ctx),
        Commands::List(args) => args.run(&ctx),
    }
}
