//! System git backend
//!
//! Uses plain git porcelain/plumbing subprocesses:
//! - `rev-parse --show-toplevel` to locate the repository
//! - `diff --name-only -z <base>` for the changed file list
//! - `show <rev>:<path>` for historical file content
//!
//! Every invocation runs in an isolated environment and honours the shared
//! `CancelToken` (Ctrl-C and per-command timeout).

use super::VersionControl;
use crate::core::cancel::CancelToken;
use crate::core::error::{AffectedError, AffectedResult, ResultExt, VcsError};
use crate::core::process::{RunOutcome, run_cancellable};
use crate::utils::path_to_git_format;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// git exits with 128 for "fatal" conditions, including a missing path at a revision.
const GIT_FATAL_EXIT: i32 = 128;

/// Git backend using system git (zero crate dependencies)
#[derive(Debug, Clone, Default)]
pub struct SystemGit {
  cancel: CancelToken,
}

impl SystemGit {
  pub fn new(cancel: CancelToken) -> Self {
    Self { cancel }
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to `dir`
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  fn git_cmd(&self, dir: &Path) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(dir);

    // Isolated environment (don't trust global config); also keeps messages in English
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("diff.relative=false");
    cmd.arg("--no-pager");

    cmd
  }

  /// Run a git command, mapping cancellation and timeouts to `VcsError`.
  fn run(&self, cmd: Command, label: &str) -> AffectedResult<Output> {
    debug!(command = label, "running git");
    let outcome = run_cancellable(cmd, &self.cancel).with_context(|| format!("Failed to execute {}", label))?;
    match outcome {
      RunOutcome::Finished(output) => Ok(output),
      RunOutcome::Cancelled => Err(AffectedError::Vcs(VcsError::Cancelled {
        command: label.to_string(),
      })),
      RunOutcome::TimedOut(timeout) => Err(AffectedError::Vcs(VcsError::TimedOut {
        command: label.to_string(),
        seconds: timeout.as_secs(),
      })),
    }
  }
}

impl VersionControl for SystemGit {
  fn repository_root(&self, working_dir: &Path) -> AffectedResult<PathBuf> {
    let mut cmd = self.git_cmd(working_dir);
    cmd.args(["rev-parse", "--show-toplevel"]);
    let output = self.run(cmd, "git rev-parse --show-toplevel")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") || stderr.contains("cannot change to") {
        return Err(AffectedError::Vcs(VcsError::RepoNotFound {
          path: working_dir.to_path_buf(),
        }));
      }
      return Err(AffectedError::Vcs(VcsError::CommandFailed {
        command: "git rev-parse --show-toplevel".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(PathBuf::from(stdout.trim()))
  }

  fn changed_files(&self, root: &Path, base_revision: &str) -> AffectedResult<Vec<PathBuf>> {
    let mut cmd = self.git_cmd(root);
    cmd.args(["diff", "--name-only", "-z", base_revision, "--"]);
    let display = format!("git diff --name-only {}", base_revision);
    let output = self.run(cmd, &display)?;

    // Without --exit-code, git diff exits 0 whether or not there are differences.
    if !output.status.success() {
      return Err(AffectedError::Vcs(VcsError::CommandFailed {
        command: display,
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    // -z output is NUL-separated and never C-quoted
    let files = output
      .stdout
      .split(|&b| b == b'\0')
      .filter(|name| !name.is_empty())
      .map(|name| PathBuf::from(String::from_utf8_lossy(name).into_owned()))
      .collect();

    Ok(files)
  }

  fn read_file_at_revision(&self, root: &Path, revision: &str, path: &Path) -> AffectedResult<Option<Vec<u8>>> {
    let spec = format!("{}:{}", revision, path_to_git_format(path));
    let mut cmd = self.git_cmd(root);
    cmd.args(["show", &spec]);
    let display = format!("git show {}", spec);
    let output = self.run(cmd, &display)?;

    if output.status.success() {
      return Ok(Some(output.stdout));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.code() == Some(GIT_FATAL_EXIT) && is_missing_path(&stderr) {
      debug!(path = %path.display(), revision, "file absent at revision");
      return Ok(None);
    }

    Err(AffectedError::Vcs(VcsError::CommandFailed {
      command: display,
      stderr: stderr.to_string(),
    }))
  }
}

/// `git show rev:path` reports a missing path with one of two messages;
/// a bad revision ("invalid object name") must stay an error.
fn is_missing_path(stderr: &str) -> bool {
  stderr.contains("does not exist in") || stderr.contains("exists on disk, but not in")
}
