//! Version control seam consumed by the change detector
//!
//! The detector never shells out itself. Everything it needs from git goes
//! through `VersionControl`, so tests can substitute an in-memory fake.

pub mod system_git;

pub use system_git::SystemGit;

use crate::core::error::{AffectedError, AffectedResult, ConfigError};
use std::path::{Path, PathBuf};

/// The three git capabilities the detector depends on.
pub trait VersionControl: Send + Sync {
  /// Absolute path of the repository containing `working_dir`.
  fn repository_root(&self, working_dir: &Path) -> AffectedResult<PathBuf>;

  /// Repo-relative paths that differ between `base_revision` and the working tree.
  fn changed_files(&self, root: &Path, base_revision: &str) -> AffectedResult<Vec<PathBuf>>;

  /// Content of `path` (repo-relative) at `revision`.
  ///
  /// Returns `Ok(None)` when the file does not exist at that revision; any
  /// other failure is an error.
  fn read_file_at_revision(&self, root: &Path, revision: &str, path: &Path) -> AffectedResult<Option<Vec<u8>>>;
}

/// Check that a user-supplied root is the top level of its repository.
///
/// Returns the top level as reported by `vcs`, so a symlinked path resolves to
/// the same root git diffs against. A subdirectory of a repository is rejected.
pub fn resolve_supplied_root(vcs: &dyn VersionControl, supplied: &Path) -> AffectedResult<PathBuf> {
  let toplevel = vcs.repository_root(supplied)?;
  if same_dir(supplied, &toplevel) {
    return Ok(toplevel);
  }
  Err(AffectedError::Config(ConfigError::InvalidValue {
    field: "repo_root".to_string(),
    reason: format!(
      "{} is not the top level of its git repository ({})",
      supplied.display(),
      toplevel.display()
    ),
  }))
}

fn same_dir(a: &Path, b: &Path) -> bool {
  match (a.canonicalize(), b.canonicalize()) {
    (Ok(a), Ok(b)) => a == b,
    _ => a == b,
  }
}
