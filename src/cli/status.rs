//! The `status` command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliContext;
use crate::config::GlobalConfig;
use crate::provider::StagingArea;

/// Show what updraft knows about the installed application.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Remove the staged update record after showing it.
    #[arg(long)]
    pub clear_pending: bool,
}

impl StatusCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config = GlobalConfig::load_with_optional(ctx.config_path.clone()).await?;
        let update = &config.update;

        println!("{}", "Update status".bold());
        println!("  Installed version: {}", update.effective_installed_version());
        println!("  Runtime version:   {}", update.effective_runtime_version());
        match config.repository_uri() {
            Ok(site) => println!("  Update site:       {site}"),
            Err(_) if !update.has_update_site() => {
                println!("  Update site:       {}", "not configured".yellow());
            }
            Err(e) => println!("  Update site:       {} ({})", update.update_site, e.to_string().red()),
        }
        println!(
            "  Check on startup:  {}",
            if update.check_on_startup { "on" } else { "off" }
        );

        let staging = StagingArea::new(update.effective_staging_dir());
        match staging.load_pending().await? {
            Some(pending) => {
                println!();
                println!(
                    "{} {} ({})",
                    "Staged update:".green(),
                    pending.version,
                    pending.id
                );
                println!("  Artifact:  {}", pending.artifact.display());
                println!("  Checksum:  {}", pending.sha256);
                println!("  Staged at: {}", pending.staged_at.format("%Y-%m-%d %H:%M:%S UTC"));

                if self.clear_pending && staging.clear_pending().await? {
                    println!("{}", "Staged update record removed".yellow());
                }
            }
            None => println!("  Staged update:     none"),
        }

        Ok(())
    }
}
