//! updraft CLI entry point
//!
//! Parses arguments, sets up logging, runs the selected command and displays
//! errors with suggestions.
//!
//! - `check` - Run an interactive update check
//! - `startup` - Run a silent check if enabled
//! - `status` - Show versions and any staged update
//! - `config` - Manage global configuration

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use updraft::cli;
use updraft::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    init_logging(cli.log_level());

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` wins over the verbosity flags. Logs go to stderr so they never
/// mix with command output.
fn init_logging(level: Option<&str>) {
    let filter = match (std::env::var("RUST_LOG"), level) {
        (Ok(_), _) => EnvFilter::from_default_env(),
        (Err(_), Some(level)) => EnvFilter::new(format!("updraft={level},warn")),
        (Err(_), None) => return,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
