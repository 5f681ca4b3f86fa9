//! Host-side collaborators: process lifecycle hooks and terminal prompts.

mod lifecycle;
mod terminal;

pub use lifecycle::CommandLifecycle;
pub use terminal::TerminalPrompter;
