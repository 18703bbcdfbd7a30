//! Git metadata for the status line
//!
//! The branch is read straight from `.git/HEAD` (no subprocess on the hot
//! path); the tag needs `git tag --points-at HEAD` and is opt-in.

use std::path::Path;

use claudeline_core::utils::{command_stdout, create_command};

/// Current branch of the repository rooted at `dir`.
///
/// `None` outside a repository, on a detached HEAD, or in a bare repo.
pub fn current_branch(dir: &Path) -> Option<String> {
    let head = std::fs::read_to_string(dir.join(".git").join("HEAD")).ok()?;
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
}

/// First tag pointing at HEAD in `dir`
pub fn head_tag(dir: &Path) -> Option<String> {
    let out = command_stdout(
        create_command("git")
            .args(["tag", "--points-at", "HEAD"])
            .current_dir(dir),
    )?;
    out.lines()
        .map(str::trim)
        .find(|tag| !tag.is_empty())
        .map(str::to_string)
}
