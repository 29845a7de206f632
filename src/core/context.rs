//! Repository context - build once, pass to every command
//!
//! ```text
//! main.rs:
//!   RepoContext::build() -> &RepoContext
//!   |
//!   v
//! commands/detect.rs, modules.rs:
//!   fn run_*(ctx: &RepoContext, ...)
//! ```

use crate::core::cancel::CancelToken;
use crate::core::config::AffectedConfig;
use crate::core::error::{AffectedResult, ResultExt};
use crate::core::vcs::{SystemGit, VersionControl, resolve_supplied_root};
use crate::utils::absolutize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Shared state for one invocation.
#[derive(Debug, Clone)]
pub struct RepoContext {
  /// Repository root (absolute path)
  pub root: PathBuf,

  /// go-affected.toml, or defaults when the repository has none
  pub config: AffectedConfig,

  /// Cancelled by Ctrl-C; carries the per-command timeout once resolved
  pub cancel: CancelToken,
}

impl RepoContext {
  /// Locate the repository and load its configuration.
  ///
  /// `repo_root` overrides git discovery. Config `timeout_secs` applies unless
  /// `timeout` is given.
  pub fn build(repo_root: Option<&Path>, timeout: Option<Duration>, cancel: CancelToken) -> AffectedResult<Self> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let git = SystemGit::new(cancel.clone());
    let root = match repo_root {
      Some(root) => resolve_supplied_root(&git, &absolutize(&cwd, root))?,
      None => git.repository_root(&cwd)?,
    };

    let config = AffectedConfig::load(&root)?;
    let timeout = timeout.unwrap_or_else(|| config.detect.timeout());
    debug!(root = %root.display(), timeout_secs = timeout.as_secs(), "built repository context");

    Ok(Self {
      cancel: cancel.rescoped(timeout),
      root,
      config,
    })
  }

  pub fn repo_root(&self) -> &Path {
    &self.root
  }

  pub fn git(&self) -> SystemGit {
    SystemGit::new(self.cancel.clone())
  }
}
