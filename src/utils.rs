//! Utility functions for cross-platform path handling

use std::path::{Component, Path, PathBuf};

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
/// This function converts backslashes to forward slashes for use in Git commands.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Lexically clean a path: drop `.` components and fold `..` into its parent.
///
/// Does not touch the filesystem, so symlinks are not resolved. An empty
/// result becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
  let mut out: Vec<Component<'_>> = Vec::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match out.last() {
        Some(Component::Normal(_)) => {
          out.pop();
        }
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
        _ => out.push(component),
      },
      other => out.push(other),
    }
  }

  if out.is_empty() {
    return PathBuf::from(".");
  }
  out.iter().collect()
}

/// Make `path` absolute against `base` (if relative) and clean it.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    clean_path(path)
  } else {
    clean_path(&base.join(path))
  }
}

/// `dir` relative to `root`, cleaned. The root itself becomes `.`.
///
/// Returns `None` when `dir` is not under `root`.
pub fn relative_dir(root: &Path, dir: &Path) -> Option<PathBuf> {
  let root = clean_path(root);
  let dir = clean_path(dir);
  dir.strip_prefix(&root).ok().map(clean_path)
}
