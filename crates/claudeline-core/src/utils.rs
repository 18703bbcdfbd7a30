//! Utility functions for claudeline-core

use std::process::Command;

/// Creates a Command that hides the console window on Windows.
///
/// Used for the short-lived helper processes the status line spawns
/// (`security` for the macOS Keychain, `git` for tag lookup). On Windows the
/// CREATE_NO_WINDOW flag keeps a console from flashing up on every render.
///
/// # Example
/// ```ignore
/// use claudeline_core::utils::create_command;
///
/// let output = create_command("git")
///     .args(["tag", "--points-at", "HEAD"])
///     .output();
/// ```
pub fn create_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        // CREATE_NO_WINDOW = 0x08000000
        cmd.creation_flags(0x08000000);
    }

    cmd
}

/// Runs a command and returns its stdout when it exits successfully.
///
/// Spawn failures, non-zero exit codes and non-UTF-8 output all yield `None`.
pub fn command_stdout(cmd: &mut Command) -> Option<String> {
    let output = cmd.output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}
