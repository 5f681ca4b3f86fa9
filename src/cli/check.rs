//! The `check` and `startup` commands.
//!
//! Both build an [`UpdateOrchestrator`] over the bundled
//! [`ManifestInstaller`], start the run on a background task and answer its
//! prompts on the terminal until it finishes.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::CliContext;
use crate::config::{GlobalConfig, GlobalConfigManager};
use crate::host::{CommandLifecycle, TerminalPrompter};
use crate::provider::ManifestInstaller;
use crate::upgrade::{RunOutcome, UpdateOrchestrator, VersionGate, foreground};
use crate::utils::Spinner;

/// Run one update check.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Print nothing when the application is already up to date.
    #[arg(long)]
    pub silent: bool,
}

impl CheckCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config = GlobalConfig::load_with_optional(ctx.config_path.clone()).await?;
        let outcome = run_check(&config, ctx, self.silent).await?;
        print_outcome(&outcome);
        Ok(())
    }
}

/// Silent check gated on `update.check_on_startup`.
#[derive(Args, Debug)]
pub struct StartupCommand {}

impl StartupCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config = GlobalConfig::load_with_optional(ctx.config_path.clone()).await?;

        if !config.update.check_on_startup {
            debug!("Check on startup is disabled");
            return Ok(());
        }
        if !config.update.has_update_site() {
            debug!("No update site configured, skipping startup check");
            return Ok(());
        }

        // Startup checks never interrupt the user with errors
        match run_check(&config, ctx, true).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => warn!("Startup update check failed: {e:#}"),
        }
        Ok(())
    }
}

/// Run one update check against the configured site, answering prompts on
/// the terminal.
async fn run_check(config: &GlobalConfig, ctx: &CliContext, silent: bool) -> Result<RunOutcome> {
    let installer = Arc::new(ManifestInstaller::new(
        config.update.effective_installed_version(),
        config.update.effective_staging_dir(),
    ));
    let (confirmation, mut foreground) = foreground::channel();
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();

    let orchestrator = Arc::new(
        UpdateOrchestrator::new(
            installer,
            Arc::new(confirmation),
            Arc::new(CommandLifecycle::from_config(&config.host)),
            VersionGate::new(config.update.effective_runtime_version()),
            config.update.update_site.clone(),
        )
        .with_progress(progress_tx),
    );

    let spinner = Spinner::new(ctx.progress);
    let follower = spinner.follow(progress_rx);
    let settings = GlobalConfigManager::with_path(GlobalConfig::resolve_path(ctx.config_path.clone())?);
    let mut prompter = TerminalPrompter::stdio(spinner.clone()).with_settings(settings);

    let task = orchestrator.spawn(silent)?;
    let result = foreground.run_until(&mut prompter, task.join()).await;

    // Last sender goes with the orchestrator, which ends the follower
    drop(orchestrator);
    if let Err(e) = follower.await {
        debug!("Progress display stopped: {e}");
    }
    spinner.finish_and_clear();

    Ok(result?)
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        // The notice, if any, was already shown by the prompter
        RunOutcome::UpToDate => {}
        RunOutcome::Cancelled => println!("{}", "Update check cancelled".yellow()),
        RunOutcome::Declined {
            version,
        } => println!("Update {version} was not installed"),
        RunOutcome::RestartDeferred {
            version,
        } => println!(
            "{}",
            format!("Update {version} installed. It takes effect the next time the application starts.")
                .green()
        ),
        RunOutcome::RestartWithheld {
            version,
        } => println!(
            "{}",
            format!(
                "Update {version} installed, but unsaved state could not be saved. Restart the application manually."
            )
            .yellow()
        ),
        RunOutcome::Restarted {
            version,
        } => println!("{}", format!("Update {version} installed, restarting...").green()),
    }
}
