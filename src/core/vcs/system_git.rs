//! System git backend
//!
//! Only what a release run needs from the checkout: its root, the commit
//! being released, and submodule hydration before builds start.
//! Every invocation runs with an isolated environment.

use crate::core::error::{ShipError, ShipResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using the system `git` binary
pub struct SystemGit {
  /// Directory the repository was opened from
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open the repository containing `path`
  pub fn open(path: &Path) -> ShipResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(ShipError::with_help(
          format!("{} is not a git repository", path.display()),
          "Run cargo ship from the release checkout, or pass --source <DIR>.",
        ));
      }
      return Err(ShipError::message(format!("Failed to open git repository: {}", stderr.trim())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(stdout.trim()),
    })
  }

  /// Full SHA of HEAD
  pub fn head_commit(&self) -> ShipResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "HEAD"])
      .output()
      .context("Failed to get HEAD commit")?;

    if !output.status.success() {
      return Err(command_failed("git rev-parse HEAD", &output.stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Whether the checkout declares submodules
  pub fn has_submodules(&self) -> bool {
    self.work_tree.join(".gitmodules").is_file()
  }

  /// `git submodule update --init --recursive`
  ///
  /// Builds read vendored sources from submodules, so they must be hydrated
  /// before any pipeline starts.
  pub fn update_submodules(&self) -> ShipResult<()> {
    let output = self
      .git_cmd()
      .args(["submodule", "update", "--init", "--recursive"])
      .output()
      .context("Failed to run git submodule update")?;

    if !output.status.success() {
      return Err(command_failed("git submodule update --init --recursive", &output.stderr));
    }

    tracing::debug!(work_tree = %self.work_tree.display(), "submodules synchronized");
    Ok(())
  }

  /// Create a git command with an isolated environment
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }
    // Submodule fetches over SSH need the agent
    if let Ok(sock) = std::env::var("SSH_AUTH_SOCK") {
      cmd.env("SSH_AUTH_SOCK", sock);
    }

    cmd.arg("-c").arg("protocol.version=2");
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }
}

fn command_failed(command: &str, stderr: &[u8]) -> ShipError {
  ShipError::message(format!(
    "Git command failed: {}\n{}",
    command,
    String::from_utf8_lossy(stderr).trim()
  ))
}
