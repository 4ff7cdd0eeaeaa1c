//! `stage-sync list [--json]`

use anyhow::{Context, Result};
use clap::Args;

use stagesync_core::{listing, registry, SyncContext};

/// List known staging/work mappings.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit the registry as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn run(self, ctx: &SyncContext) -> Result<()> {
        let reg = registry::load_at(&ctx.config_path).with_context(|| {
            format!("failed to load registry at {}", ctx.config_path.display())
        })?;

        if self.json {
            println!("{}", registry::to_json(&reg)?);
        } else {
            print!("{}", listing::render(&reg));
        }
        Ok(())
    }
}
