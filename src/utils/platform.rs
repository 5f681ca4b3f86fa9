//! Platform helpers.

/// Shell used to run configured hook commands, as `(program, flag)`.
///
/// - Windows: `("cmd", "/C")`
/// - Unix-like: `("sh", "-c")`
#[must_use]
pub const fn get_shell_command() -> (&'static str, &'static str) {
    if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") }
}

/// A [`tokio::process::Command`] that runs `command_line` through the platform shell.
#[must_use]
pub fn shell_command(command_line: &str) -> tokio::process::Command {
    let (shell, flag) = get_shell_command();
    let mut command = tokio::process::Command::new(shell);
    command.arg(flag).arg(command_line);
    command
}
