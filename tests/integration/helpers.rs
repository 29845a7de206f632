//! Test helpers for integration tests

use anyhow::{Context, Result};
use go_affected::AffectedResult;
use go_affected::golang::{ModuleDescriptor, Package, PackageLoader};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A test repository with git history
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a new repository with an initial commit
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().canonicalize()?;

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;

    std::fs::write(path.join("README.md"), "# mono\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial commit"])?;

    Ok(Self { _root: root, path })
  }

  /// Write a go.mod for `module` in `dir` with the given requirements
  pub fn add_module(&self, dir: &str, module: &str, requires: &[(&str, &str)]) -> Result<PathBuf> {
    let module_dir = self.path.join(dir);
    std::fs::create_dir_all(&module_dir)?;

    let mut go_mod = format!("module {}\n\ngo 1.22\n", module);
    if !requires.is_empty() {
      go_mod.push_str("\nrequire (\n");
      for (path, version) in requires {
        go_mod.push_str(&format!("\t{} {}\n", path, version));
      }
      go_mod.push_str(")\n");
    }
    std::fs::write(module_dir.join("go.mod"), go_mod)?;

    Ok(module_dir)
  }

  /// Write a file relative to the repository root, creating parent directories
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let file_path = self.path.join(path);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// A package in `dir` (relative to the root) owned by the go.mod in `module_dir`
  pub fn package(&self, module_dir: &str, dir: &str, import_path: &str, files: &[&str], imports: &[&str]) -> Package {
    let pkg_dir = self.path.join(dir);
    Package {
      import_path: import_path.to_string(),
      files: files.iter().map(|f| pkg_dir.join(f)).collect(),
      dir: pkg_dir,
      imports: imports.iter().map(|s| s.to_string()).collect(),
      module: Some(ModuleDescriptor {
        path: import_path.to_string(),
        go_mod: self.path.join(module_dir).join("go.mod"),
      }),
    }
  }
}

/// PackageLoader returning a fixed listing for every module root
pub struct StaticLoader {
  pub packages: Vec<Package>,
}

impl PackageLoader for StaticLoader {
  fn list_packages(&self, module_root: &Path) -> AffectedResult<Vec<Package>> {
    Ok(
      self
        .packages
        .iter()
        .filter(|p| p.dir.starts_with(module_root))
        .cloned()
        .collect(),
    )
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the go-affected binary without checking its exit status
pub fn run_go_affected_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_go-affected"))
    .current_dir(cwd)
    .env_remove("GO_AFFECTED_LOG")
    .args(args)
    .output()
    .context("Failed to run go-affected")
}

/// Run the go-affected binary, failing on a non-zero exit
pub fn run_go_affected(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_go_affected_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "go-affected command failed: go-affected {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
