//! Prompts rendered on the terminal.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use colored::Colorize;
use tracing::warn;

use crate::config::GlobalConfigManager;
use crate::upgrade::{PromptHandler, RestartChoice, UpdatePrompt};
use crate::utils::Spinner;

type Input = Arc<Mutex<Box<dyn BufRead + Send>>>;
type Output = Arc<Mutex<Box<dyn Write + Send>>>;

/// [`PromptHandler`] that asks on the terminal.
///
/// The update prompt also offers to toggle the check-on-startup setting, which
/// is written back through the configured [`GlobalConfigManager`]. End of input
/// counts as "no" and "later".
pub struct TerminalPrompter {
    input: Input,
    output: Output,
    spinner: Spinner,
    settings: Option<GlobalConfigManager>,
}

impl TerminalPrompter {
    /// Prompter reading stdin and writing stderr.
    pub fn stdio(spinner: Spinner) -> Self {
        Self::with_io(BufReader::new(io::stdin()), io::stderr(), spinner)
    }

    pub fn with_io(
        input: impl BufRead + Send + 'static,
        output: impl Write + Send + 'static,
        spinner: Spinner,
    ) -> Self {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
            output: Arc::new(Mutex::new(Box::new(output))),
            spinner,
            settings: None,
        }
    }

    /// Persist check-on-startup changes through `settings`.
    #[must_use]
    pub fn with_settings(mut self, settings: GlobalConfigManager) -> Self {
        self.settings = Some(settings);
        self
    }

    fn say(&self, text: &str) {
        let output = Arc::clone(&self.output);
        self.spinner.suspend(|| write_line(&output, text));
    }

    /// Print `question` and read one answer, trimmed and lowercased.
    /// `None` on end of input.
    async fn ask(&self, question: String) -> Option<String> {
        let input = Arc::clone(&self.input);
        let output = Arc::clone(&self.output);
        let spinner = self.spinner.clone();

        let answer = tokio::task::spawn_blocking(move || {
            spinner.suspend(|| {
                {
                    let mut out = output.lock().ok()?;
                    write!(out, "{question} ").ok()?;
                    out.flush().ok()?;
                }
                let mut line = String::new();
                let read = input.lock().ok()?.read_line(&mut line).ok()?;
                (read > 0).then(|| line.trim().to_lowercase())
            })
        })
        .await;

        answer.unwrap_or_else(|e| {
            warn!("Prompt failed: {e}");
            None
        })
    }

    async fn check_on_startup(&mut self) -> Option<bool> {
        let settings = self.settings.as_mut()?;
        match settings.get().await {
            Ok(config) => Some(config.update.check_on_startup),
            Err(e) => {
                warn!("Could not read settings: {e:#}");
                None
            }
        }
    }

    async fn toggle_check_on_startup(&mut self) -> Option<bool> {
        let settings = self.settings.as_mut()?;
        let result = async {
            let config = settings.get_mut().await?;
            config.update.check_on_startup = !config.update.check_on_startup;
            let enabled = config.update.check_on_startup;
            settings.save().await?;
            anyhow::Ok(enabled)
        }
        .await;

        match result {
            Ok(enabled) => Some(enabled),
            Err(e) => {
                warn!("Could not save settings: {e:#}");
                None
            }
        }
    }
}

fn write_line(output: &Output, text: &str) {
    if let Ok(mut out) = output.lock() {
        let _ = writeln!(out, "{text}");
    }
}

fn describe_startup_check(enabled: bool) -> String {
    format!("Check for updates on startup: {}", if enabled { "on" } else { "off" })
}

#[async_trait]
impl PromptHandler for TerminalPrompter {
    async fn confirm_update(&mut self, prompt: &UpdatePrompt) -> bool {
        self.say(&format!("{} {}", "Update available:".bold(), prompt.version.green()));
        if prompt.runtime_gate_triggered {
            self.say(
                &"Warning: this update requires a newer runtime than the one currently installed."
                    .red()
                    .bold()
                    .to_string(),
            );
        }
        if let Some(description) = prompt.description.as_deref().filter(|d| !d.trim().is_empty()) {
            self.say("");
            self.say(description);
            self.say("");
        }

        let toggle_available = match self.check_on_startup().await {
            Some(enabled) => {
                self.say(&describe_startup_check(enabled));
                true
            }
            None => false,
        };
        let question = if toggle_available {
            format!("Install {}? [y/N, t = toggle startup check]", prompt.version)
        } else {
            format!("Install {}? [y/N]", prompt.version)
        };

        loop {
            match self.ask(question.clone()).await.as_deref() {
                Some("y" | "yes") => return true,
                Some("t") if toggle_available => {
                    if let Some(enabled) = self.toggle_check_on_startup().await {
                        self.say(&describe_startup_check(enabled));
                    }
                }
                Some("" | "n" | "no") | None => return false,
                Some(other) => self.say(&format!("Unrecognized answer '{other}'")),
            }
        }
    }

    async fn confirm_restart(&mut self) -> RestartChoice {
        self.say(&"The update has been installed.".green().to_string());
        loop {
            match self.ask("Restart now? [Y/n]".to_string()).await.as_deref() {
                Some("" | "y" | "yes") => return RestartChoice::Now,
                Some("n" | "no" | "later") | None => return RestartChoice::Later,
                Some(other) => self.say(&format!("Unrecognized answer '{other}'")),
            }
        }
    }

    async fn notify_no_update_available(&mut self) {
        self.say(&"No updates available. You are running the latest version.".green().to_string());
    }
}
