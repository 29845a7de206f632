//! Go package enumeration
//!
//! The detector consumes packages through `PackageLoader`. The production
//! implementation, `GoListLoader`, shells out to `go list -e -json ./...` in
//! each module root and decodes the concatenated JSON objects it prints.

use crate::core::cancel::CancelToken;
use crate::core::error::{AffectedError, AffectedResult, LoaderError, ResultExt};
use crate::core::process::{RunOutcome, run_cancellable};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

/// The module a package belongs to.
///
/// Identity is the go.mod path; the detector uses it as the cache key for
/// changed-dependency sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDescriptor {
  /// Module path declared in go.mod (`module example.com/x`)
  pub path: String,
  /// Absolute path of the go.mod file
  pub go_mod: PathBuf,
}

/// A Go package in the current working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
  /// Unique within one loaded universe
  pub import_path: String,
  /// Absolute package directory
  pub dir: PathBuf,
  /// Absolute paths of every file belonging to the package: Go sources, test
  /// sources, embedded files and non-Go sources
  pub files: Vec<PathBuf>,
  /// Import paths of imported packages, including test imports
  pub imports: Vec<String>,
  /// Owning module; `None` outside module mode
  pub module: Option<ModuleDescriptor>,
}

/// Enumerates every package under a module root.
pub trait PackageLoader: Send + Sync {
  fn list_packages(&self, module_root: &Path) -> AffectedResult<Vec<Package>>;
}

/// `PackageLoader` backed by the go toolchain.
#[derive(Debug, Clone, Default)]
pub struct GoListLoader {
  cancel: CancelToken,
}

impl GoListLoader {
  pub fn new(cancel: CancelToken) -> Self {
    Self { cancel }
  }
}

impl PackageLoader for GoListLoader {
  fn list_packages(&self, module_root: &Path) -> AffectedResult<Vec<Package>> {
    let mut cmd = Command::new("go");
    cmd.current_dir(module_root).args(["list", "-e", "-json", "./..."]);

    debug!(dir = %module_root.display(), "running go list");
    let outcome = run_cancellable(cmd, &self.cancel)
      .with_context(|| format!("Failed to execute go list in {}", module_root.display()))?;

    let output = finished_output(module_root, outcome)?;

    if !output.status.success() {
      return Err(AffectedError::Loader(LoaderError::CommandFailed {
        dir: module_root.to_path_buf(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    let packages = decode_go_list(module_root, &output.stdout)?;
    debug!(dir = %module_root.display(), count = packages.len(), "listed packages");
    Ok(packages)
  }
}

fn finished_output(module_root: &Path, outcome: RunOutcome) -> Result<Output, LoaderError> {
  match outcome {
    RunOutcome::Finished(output) => Ok(output),
    RunOutcome::Cancelled => Err(LoaderError::Cancelled {
      dir: module_root.to_path_buf(),
    }),
    RunOutcome::TimedOut(limit) => Err(LoaderError::TimedOut {
      dir: module_root.to_path_buf(),
      seconds: limit.as_secs(),
    }),
  }
}

/// Decode the JSON stream printed by `go list -json`.
pub fn decode_go_list(module_root: &Path, stdout: &[u8]) -> AffectedResult<Vec<Package>> {
  let mut packages = Vec::new();
  for item in serde_json::Deserializer::from_slice(stdout).into_iter::<GoListPackage>() {
    let raw = item.map_err(|e| {
      AffectedError::Loader(LoaderError::Decode {
        dir: module_root.to_path_buf(),
        reason: e.to_string(),
      })
    })?;
    if let Some(error) = &raw.error {
      warn!(package = %raw.import_path, error = %error.err, "go list reported a package error");
    }
    packages.push(raw.into_package());
  }
  Ok(packages)
}

/// The subset of `go list -json` output the detector needs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GoListPackage {
  dir: PathBuf,
  import_path: String,
  go_files: Vec<String>,
  cgo_files: Vec<String>,
  c_files: Vec<String>,
  #[serde(rename = "CXXFiles")]
  cxx_files: Vec<String>,
  m_files: Vec<String>,
  h_files: Vec<String>,
  f_files: Vec<String>,
  s_files: Vec<String>,
  swig_files: Vec<String>,
  #[serde(rename = "SwigCXXFiles")]
  swig_cxx_files: Vec<String>,
  syso_files: Vec<String>,
  test_go_files: Vec<String>,
  #[serde(rename = "XTestGoFiles")]
  x_test_go_files: Vec<String>,
  embed_files: Vec<String>,
  test_embed_files: Vec<String>,
  #[serde(rename = "XTestEmbedFiles")]
  x_test_embed_files: Vec<String>,
  imports: Vec<String>,
  test_imports: Vec<String>,
  #[serde(rename = "XTestImports")]
  x_test_imports: Vec<String>,
  module: Option<GoListModule>,
  error: Option<GoListError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GoListModule {
  path: String,
  go_mod: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GoListError {
  err: String,
}

impl GoListPackage {
  fn into_package(self) -> Package {
    let dir = self.dir;

    // go list reports file names relative to the package directory
    let files = [
      self.go_files,
      self.cgo_files,
      self.c_files,
      self.cxx_files,
      self.m_files,
      self.h_files,
      self.f_files,
      self.s_files,
      self.swig_files,
      self.swig_cxx_files,
      self.syso_files,
      self.test_go_files,
      self.x_test_go_files,
      self.embed_files,
      self.test_embed_files,
      self.x_test_embed_files,
    ]
    .into_iter()
    .flatten()
    .map(|name| dir.join(name))
    .collect();

    let mut seen = HashSet::new();
    let imports = [self.imports, self.test_imports, self.x_test_imports]
      .into_iter()
      .flatten()
      // The external test package imports the package under test
      .filter(|import| *import != self.import_path)
      .filter(|import| seen.insert(import.clone()))
      .collect();

    let module = self.module.and_then(|m| {
      m.go_mod.map(|go_mod| ModuleDescriptor {
        path: m.path,
        go_mod,
      })
    });

    Package {
      import_path: self.import_path,
      dir,
      files,
      imports,
      module,
    }
  }
}
