//! Handoff of prompts from a background run to the interactive surface.
//!
//! The run executes on a background task, while prompts must be answered on
//! the single foreground context that owns the terminal (or window). The
//! background side holds a [`ForegroundConfirmation`], which implements
//! [`Confirmation`] by sending a [`PromptRequest`] and suspending on a oneshot
//! reply. The foreground side owns the matching [`Foreground`] and answers each
//! request through a [`PromptHandler`] until the background work completes.
//!
//! If the foreground goes away, pending and future prompts resolve to
//! "decline" and "later" so the run can still reach `Idle`.

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::core::UpdateError;
use crate::upgrade::collaborators::Confirmation;
use crate::upgrade::model::{RestartChoice, UpdatePrompt};

/// A prompt waiting to be shown on the foreground.
#[derive(Debug)]
pub enum PromptRequest {
    ConfirmUpdate {
        prompt: UpdatePrompt,
        respond_to: oneshot::Sender<bool>,
    },
    ConfirmRestart {
        respond_to: oneshot::Sender<RestartChoice>,
    },
    NoUpdateAvailable,
}

/// Renders prompts on the foreground and collects the user's answers.
#[async_trait]
pub trait PromptHandler: Send {
    async fn confirm_update(&mut self, prompt: &UpdatePrompt) -> bool;

    async fn confirm_restart(&mut self) -> RestartChoice;

    async fn notify_no_update_available(&mut self);
}

/// Background half of the handoff.
#[derive(Debug, Clone)]
pub struct ForegroundConfirmation {
    requests: mpsc::UnboundedSender<PromptRequest>,
}

/// Foreground half of the handoff.
#[derive(Debug)]
pub struct Foreground {
    requests: mpsc::UnboundedReceiver<PromptRequest>,
}

/// Create a connected background/foreground pair.
#[must_use]
pub fn channel() -> (ForegroundConfirmation, Foreground) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ForegroundConfirmation {
            requests: tx,
        },
        Foreground {
            requests: rx,
        },
    )
}

impl ForegroundConfirmation {
    /// Ask the foreground to confirm an update.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ForegroundUnavailable`] if the foreground is gone
    /// or dropped the request without answering.
    pub async fn request_update(&self, prompt: &UpdatePrompt) -> Result<bool, UpdateError> {
        let (respond_to, response) = oneshot::channel();
        self.send(PromptRequest::ConfirmUpdate {
            prompt: prompt.clone(),
            respond_to,
        })?;
        response.await.map_err(|_| UpdateError::ForegroundUnavailable)
    }

    /// Ask the foreground whether to restart now.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ForegroundUnavailable`] if the foreground is gone
    /// or dropped the request without answering.
    pub async fn request_restart(&self) -> Result<RestartChoice, UpdateError> {
        let (respond_to, response) = oneshot::channel();
        self.send(PromptRequest::ConfirmRestart {
            respond_to,
        })?;
        response.await.map_err(|_| UpdateError::ForegroundUnavailable)
    }

    fn send(&self, request: PromptRequest) -> Result<(), UpdateError> {
        self.requests.send(request).map_err(|_| UpdateError::ForegroundUnavailable)
    }
}

#[async_trait]
impl Confirmation for ForegroundConfirmation {
    async fn confirm_update(&self, prompt: &UpdatePrompt) -> bool {
        self.request_update(prompt).await.unwrap_or_else(|e| {
            warn!("Treating update {} as declined: {e}", prompt.version);
            false
        })
    }

    async fn confirm_restart(&self) -> RestartChoice {
        self.request_restart().await.unwrap_or_else(|e| {
            warn!("Deferring restart: {e}");
            RestartChoice::Later
        })
    }

    fn notify_no_update_available(&self) {
        if self.send(PromptRequest::NoUpdateAvailable).is_err() {
            debug!("No foreground to notify that the application is up to date");
        }
    }
}

impl Foreground {
    /// Answer prompts with `handler` until `work` completes.
    ///
    /// `work` is usually the join handle of a background run. Notices still
    /// queued when it completes are delivered before returning; unanswered
    /// prompts are dropped.
    pub async fn run_until<H, F>(&mut self, handler: &mut H, work: F) -> F::Output
    where
        H: PromptHandler + ?Sized,
        F: Future,
    {
        tokio::pin!(work);

        loop {
            tokio::select! {
                biased;
                request = self.requests.recv() => match request {
                    Some(request) => dispatch(handler, request).await,
                    None => break,
                },
                output = &mut work => {
                    self.drain_notices(handler).await;
                    return output;
                }
            }
        }

        // Every background handle is gone; nothing left to answer
        work.await
    }

    async fn drain_notices<H: PromptHandler + ?Sized>(&mut self, handler: &mut H) {
        while let Ok(request) = self.requests.try_recv() {
            if matches!(request, PromptRequest::NoUpdateAvailable) {
                handler.notify_no_update_available().await;
            }
        }
    }
}

async fn dispatch<H: PromptHandler + ?Sized>(handler: &mut H, request: PromptRequest) {
    match request {
        PromptRequest::ConfirmUpdate {
            prompt,
            respond_to,
        } => {
            let accepted = handler.confirm_update(&prompt).await;
            if respond_to.send(accepted).is_err() {
                debug!("Update run stopped waiting for the update answer");
            }
        }
        PromptRequest::ConfirmRestart {
            respond_to,
        } => {
            let choice = handler.confirm_restart().await;
            if respond_to.send(choice).is_err() {
                debug!("Update run stopped waiting for the restart answer");
            }
        }
        PromptRequest::NoUpdateAvailable => handler.notify_no_update_available().await,
    }
}
