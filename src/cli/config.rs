//! Manage the global updraft configuration.
//!
//! # Examples
//!
//! ```bash
//! updraft config init
//! updraft config show          # also the default
//! updraft config path
//! updraft config get update.update_site
//! updraft config set update.update_site https://downloads.example.com/updates/
//! updraft config set update.check_on_startup true
//! updraft config set host.restart_command ""   # clear
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::Path;

use super::CliContext;
use crate::config::GlobalConfig;

/// Command to manage the global configuration file.
///
/// Without a subcommand the current configuration is shown.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Write a configuration file with default settings.
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },

    /// Display the current configuration.
    Show,

    /// Print the location of the configuration file.
    Path,

    /// Print a single setting.
    Get {
        /// Dotted key, e.g. `update.update_site`.
        key: String,
    },

    /// Change a single setting. An empty value clears optional settings.
    Set {
        /// Dotted key, e.g. `update.check_on_startup`.
        key: String,
        /// New value.
        value: String,
    },
}

impl ConfigCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let path = GlobalConfig::resolve_path(ctx.config_path.clone())?;

        match self.command {
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(&path, force).await,
            Some(ConfigSubcommands::Show) | None => Self::show(&path).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", path.display());
                Ok(())
            }
            Some(ConfigSubcommands::Get {
                key,
            }) => Self::get(&path, &key).await,
            Some(ConfigSubcommands::Set {
                key,
                value,
            }) => Self::set(&path, &key, &value).await,
        }
    }

    async fn init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            println!("{} Configuration already exists at {}", "✗".red(), path.display());
            println!("  Use --force to overwrite");
            return Ok(());
        }

        GlobalConfig::default().save_to(path).await?;
        println!("{} Created configuration at {}", "✓".green(), path.display());
        println!("\n{}", "Next step:".yellow());
        println!("  updraft config set update.update_site <uri>");
        Ok(())
    }

    async fn show(path: &Path) -> Result<()> {
        let config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;

        println!("{}", "Global Configuration".bold());
        println!("Location: {}\n", path.display());

        if !path.exists() {
            println!("No configuration file, using defaults.");
        }
        println!("{}", config.to_toml_string()?);

        if !config.update.has_update_site() {
            println!("{}", "Tip:".yellow());
            println!("  Run 'updraft config set update.update_site <uri>' to enable update checks");
        }
        Ok(())
    }

    async fn get(path: &Path, key: &str) -> Result<()> {
        let config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;
        if let Some(value) = config.get(key)? {
            println!("{value}");
        }
        Ok(())
    }

    async fn set(path: &Path, key: &str, value: &str) -> Result<()> {
        let mut config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;
        config.set(key, value)?;
        config.save_to(path).await?;

        match config.get(key)? {
            Some(stored) => println!("{} {key} = {stored}", "✓".green()),
            None => println!("{} {key} cleared", "✓".green()),
        }
        Ok(())
    }

    #[cfg(test)]
    fn with(command: ConfigSubcommands) -> Self {
        Self {
            command: Some(command),
        }
    }
}
