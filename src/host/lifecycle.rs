use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::upgrade::ProcessLifecycle;
use crate::utils::platform::shell_command;

/// [`ProcessLifecycle`] that runs configured shell commands.
///
/// Without a save command there is nothing to save and restarting is always
/// safe. Without a restart command the user is told to restart manually.
#[derive(Debug, Clone, Default)]
pub struct CommandLifecycle {
    save_command: Option<String>,
    restart_command: Option<String>,
}

impl CommandLifecycle {
    pub fn new(save_command: Option<String>, restart_command: Option<String>) -> Self {
        Self {
            save_command,
            restart_command,
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(config.save_command.clone(), config.restart_command.clone())
    }
}

#[async_trait]
impl ProcessLifecycle for CommandLifecycle {
    async fn save_all_unsaved_state(&self) -> bool {
        let Some(command) = self.save_command.as_deref() else {
            debug!("No save command configured");
            return true;
        };

        debug!("Running save command: {command}");
        match shell_command(command).stdin(Stdio::null()).status().await {
            Ok(status) if status.success() => true,
            Ok(status) => {
                warn!("Save command exited with {status}");
                false
            }
            Err(e) => {
                warn!("Failed to run save command '{command}': {e}");
                false
            }
        }
    }

    async fn restart_process(&self) {
        let Some(command) = self.restart_command.as_deref() else {
            info!("No restart command configured, restart the application to use the update");
            return;
        };

        info!("Restarting with: {command}");
        // The relaunched process outlives us, so it is not awaited
        if let Err(e) = shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            warn!("Failed to run restart command '{command}': {e}");
        }
    }
}
