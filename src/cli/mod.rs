//! Command-line interface for updraft.
//!
//! The binary lets a host application (or its user) drive update runs from the
//! terminal. Every command shares the same global options.
//!
//! # Commands
//!
//! - `check` - Run one interactive update check
//! - `startup` - Run a silent check if check-on-startup is enabled
//! - `status` - Show versions, the update site and any staged update
//! - `config` - Inspect and change the global configuration
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging
//! - `--quiet` - Disable logging
//! - `--no-progress` - Disable the spinner
//! - `--config` - Path to a custom config file
//!
//! # Example
//!
//! ```bash
//! updraft config set update.update_site https://downloads.example.com/updates/
//! updraft check
//! updraft --no-progress startup
//! ```

mod check;
mod config;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::progress::NO_PROGRESS_ENV;

/// Options shared by every command after parsing.
#[derive(Debug, Clone, Default)]
pub struct CliContext {
    /// Explicit configuration file, overriding `UPDRAFT_CONFIG_PATH` and the default.
    pub config_path: Option<PathBuf>,

    /// Whether the spinner may be drawn.
    pub progress: bool,
}

/// Top-level command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "updraft",
    about = "Check for, confirm, install and restart into application updates",
    version,
    author,
    long_about = "updraft checks a configured update site for a newer version of the \
                  application, asks before installing it and offers to restart once it is staged."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all logging. Prompts and results are still printed.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a custom global configuration file.
    ///
    /// Overrides `UPDRAFT_CONFIG_PATH` and the default location
    /// (`~/.updraft/config.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable the progress spinner.
    ///
    /// Also disabled when `UPDRAFT_NO_PROGRESS` is set.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for an update and offer to install it.
    Check(check::CheckCommand),

    /// Check silently if check-on-startup is enabled.
    ///
    /// Intended to be called by the host application when it starts. Does
    /// nothing when the setting is off or no update site is configured.
    Startup(check::StartupCommand),

    /// Show the installed version, runtime, update site and staged update.
    Status(status::StatusCommand),

    /// Manage the global configuration.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Log filter implied by the verbosity flags, or `None` when logging is off.
    #[must_use]
    pub const fn log_level(&self) -> Option<&'static str> {
        if self.quiet {
            None
        } else if self.verbose {
            Some("debug")
        } else {
            Some("info")
        }
    }

    /// Context handed to the selected command.
    #[must_use]
    pub fn context(&self) -> CliContext {
        CliContext {
            config_path: self.config.clone(),
            progress: !self.no_progress && std::env::var_os(NO_PROGRESS_ENV).is_none(),
        }
    }

    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error for display by the binary.
    pub async fn execute(self) -> Result<()> {
        let ctx = self.context();

        match self.command {
            Commands::Check(cmd) => cmd.execute(&ctx).await,
            Commands::Startup(cmd) => cmd.execute(&ctx).await,
            Commands::Status(cmd) => cmd.execute(&ctx).await,
            Commands::Config(cmd) => cmd.execute(&ctx).await,
        }
    }
}
