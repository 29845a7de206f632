//! Affected package analysis
//!
//! Given a base revision and the current working tree, determine:
//! - Which packages directly contain changed files (phase 1)
//! - Which packages are affected through an import of a changed package or of a
//!   third-party module whose resolved version changed (phase 2)
//!
//! Phase 2 comes in two flavours, see [`Propagation`].

use super::import_graph::ImportGraph;
use super::ownership::owning_dependency;
use crate::core::error::{AffectedError, AffectedResult, ConfigError, ResultExt};
use crate::core::vcs::{VersionControl, resolve_supplied_root};
use crate::golang::manifest::{self, VersionMap};
use crate::golang::{Package, PackageLoader};
use crate::utils::{absolutize, clean_path, relative_dir};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// How indirect hits spread through the import graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Propagation {
  /// Breadth-first fixed point over reverse imports. Order independent.
  #[default]
  Transitive,
  /// One linear pass in listing order. A package is only caught through a
  /// sibling if that sibling was marked earlier in the same pass.
  SinglePass,
}

impl FromStr for Propagation {
  type Err = AffectedError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "transitive" => Ok(Self::Transitive),
      "single-pass" => Ok(Self::SinglePass),
      other => Err(AffectedError::Config(ConfigError::InvalidValue {
        field: "propagation".to_string(),
        reason: format!("unknown mode '{}' (expected 'transitive' or 'single-pass')", other),
      })),
    }
  }
}

impl fmt::Display for Propagation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Propagation::Transitive => write!(f, "transitive"),
      Propagation::SinglePass => write!(f, "single-pass"),
    }
  }
}

/// Inputs to a detection run.
#[derive(Debug, Clone)]
pub struct DetectorOptions {
  /// Repository root; located through the VCS when `None`
  pub repo_root: Option<PathBuf>,
  /// Revision to diff the working tree against, e.g. `HEAD~`
  pub base_revision: String,
  /// Module root directories, absolute or relative to the repository root
  pub module_roots: Vec<PathBuf>,
  pub propagation: Propagation,
}

/// One affected package in the result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ChangedPackage {
  /// Package directory relative to the repository root
  pub dir: PathBuf,
  pub import_path: String,
}

/// Changed-dependency sets memoized by go.mod path.
///
/// Lives for one `detect_changed_packages` call. The lock is never held while
/// git runs or a manifest is parsed; two threads racing on the same go.mod
/// both compute the same set and the first insert wins.
#[derive(Debug, Default)]
pub struct ChangedDependencyCache {
  entries: Mutex<HashMap<PathBuf, Arc<BTreeSet<String>>>>,
}

impl ChangedDependencyCache {
  pub fn get(&self, go_mod: &Path) -> Option<Arc<BTreeSet<String>>> {
    self.lock().get(go_mod).cloned()
  }

  pub fn get_or_try_insert<F>(&self, go_mod: &Path, compute: F) -> AffectedResult<Arc<BTreeSet<String>>>
  where
    F: FnOnce() -> AffectedResult<BTreeSet<String>>,
  {
    if let Some(hit) = self.get(go_mod) {
      return Ok(hit);
    }
    let computed = Arc::new(compute()?);
    Ok(self.lock().entry(go_mod.to_path_buf()).or_insert(computed).clone())
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<BTreeSet<String>>>> {
    // A poisoned lock only means another worker panicked mid-insert; the map is still valid.
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

/// Classifies every package under the configured module roots as changed or not.
pub struct ChangeDetector<'a> {
  vcs: &'a dyn VersionControl,
  loader: &'a dyn PackageLoader,
  repo_root: PathBuf,
  base_revision: String,
  module_roots: Vec<PathBuf>,
  propagation: Propagation,
  /// Absolute paths of files in the diff
  changed_files: HashSet<PathBuf>,
}

impl<'a> ChangeDetector<'a> {
  /// Locate the repository (if needed) and collect the changed files.
  ///
  /// Fails fast if git fails; nothing is cached across runs.
  pub fn new(vcs: &'a dyn VersionControl, loader: &'a dyn PackageLoader, options: DetectorOptions) -> AffectedResult<Self> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let repo_root = match options.repo_root {
      Some(root) => resolve_supplied_root(vcs, &absolutize(&cwd, &root))?,
      None => vcs.repository_root(&cwd)?,
    };

    let files = vcs.changed_files(&repo_root, &options.base_revision)?;
    let changed_files: HashSet<PathBuf> = files.iter().map(|file| clean_path(&repo_root.join(file))).collect();
    info!(base = %options.base_revision, count = changed_files.len(), "collected changed files");

    let module_roots = options
      .module_roots
      .iter()
      .map(|root| absolutize(&repo_root, root))
      .collect();

    Ok(Self {
      vcs,
      loader,
      repo_root,
      base_revision: options.base_revision,
      module_roots,
      propagation: options.propagation,
      changed_files,
    })
  }

  pub fn repo_root(&self) -> &Path {
    &self.repo_root
  }

  /// Changed files as absolute paths, sorted
  pub fn changed_files(&self) -> Vec<&Path> {
    let mut files: Vec<&Path> = self.changed_files.iter().map(PathBuf::as_path).collect();
    files.sort();
    files
  }

  /// Run both phases and return the affected packages sorted by import path.
  pub fn detect_changed_packages(&self) -> AffectedResult<Vec<ChangedPackage>> {
    let packages = self.load_packages()?;
    let cache = ChangedDependencyCache::default();

    // Phase 1: direct hits. Keyed by import path; doubles as the membership test for phase 2.
    let mut changed: HashMap<&str, &Package> = HashMap::new();
    for package in &packages {
      if self.is_directly_changed(package) {
        changed.insert(&package.import_path, package);
      }
    }
    info!(packages = packages.len(), direct = changed.len(), "phase 1 complete");

    self.prefetch_changed_dependencies(&packages, &changed, &cache)?;

    // Phase 2: indirect hits
    match self.propagation {
      Propagation::SinglePass => self.propagate_single_pass(&packages, &mut changed, &cache)?,
      Propagation::Transitive => self.propagate_transitive(&packages, &mut changed, &cache)?,
    }
    info!(changed = changed.len(), propagation = %self.propagation, "phase 2 complete");

    self.render(changed)
  }

  /// List packages of every module root, in root order then listing order.
  fn load_packages(&self) -> AffectedResult<Vec<Package>> {
    let per_root: Vec<Vec<Package>> = self
      .module_roots
      .par_iter()
      .map(|root| self.loader.list_packages(root))
      .collect::<AffectedResult<_>>()?;
    Ok(per_root.into_iter().flatten().collect())
  }

  /// A package is directly changed iff one of its files is in the diff.
  pub fn is_directly_changed(&self, package: &Package) -> bool {
    package
      .files
      .iter()
      .any(|file| self.changed_files.contains(&clean_path(file)))
  }

  /// Compute the changed-dependency set of every go.mod phase 2 will consult.
  ///
  /// Independent per manifest, so they run in parallel. Any failure aborts the run.
  fn prefetch_changed_dependencies(
    &self,
    packages: &[Package],
    changed: &HashMap<&str, &Package>,
    cache: &ChangedDependencyCache,
  ) -> AffectedResult<()> {
    let manifests: BTreeSet<&Path> = packages
      .iter()
      .filter(|package| !changed.contains_key(package.import_path.as_str()))
      .filter_map(|package| package.module.as_ref())
      .map(|module| module.go_mod.as_path())
      .collect();

    manifests
      .into_par_iter()
      .try_for_each(|go_mod| self.changed_dependencies(go_mod, cache).map(|_| ()))
  }

  /// Historical behaviour: one pass in listing order.
  fn propagate_single_pass<'p>(
    &self,
    packages: &'p [Package],
    changed: &mut HashMap<&'p str, &'p Package>,
    cache: &ChangedDependencyCache,
  ) -> AffectedResult<()> {
    for package in packages {
      if changed.contains_key(package.import_path.as_str()) {
        continue;
      }
      let via_sibling = package.imports.iter().any(|import| changed.contains_key(import.as_str()));
      if via_sibling || self.imports_changed_dependency(package, cache)? {
        debug!(package = %package.import_path, via_sibling, "indirect hit");
        changed.insert(&package.import_path, package);
      }
    }
    Ok(())
  }

  /// Fixed point: seeds are the direct hits plus every package importing a
  /// changed third-party module; everything that reaches a seed through
  /// imports is affected too.
  fn propagate_transitive<'p>(
    &self,
    packages: &'p [Package],
    changed: &mut HashMap<&'p str, &'p Package>,
    cache: &ChangedDependencyCache,
  ) -> AffectedResult<()> {
    for package in packages {
      if !changed.contains_key(package.import_path.as_str()) && self.imports_changed_dependency(package, cache)? {
        debug!(package = %package.import_path, "third-party dependency hit");
        changed.insert(&package.import_path, package);
      }
    }

    let graph = ImportGraph::from_packages(packages);
    let importers = graph.transitive_importers(changed.keys().copied().collect::<Vec<_>>());
    for package in packages {
      if importers.contains(&package.import_path) && !changed.contains_key(package.import_path.as_str()) {
        debug!(package = %package.import_path, "transitive hit");
        changed.insert(&package.import_path, package);
      }
    }
    Ok(())
  }

  /// Whether any import of `package` lives in a module whose resolved version changed.
  fn imports_changed_dependency(&self, package: &Package, cache: &ChangedDependencyCache) -> AffectedResult<bool> {
    let Some(module) = &package.module else {
      return Ok(false);
    };
    let dependencies = self.changed_dependencies(&module.go_mod, cache)?;
    Ok(
      package
        .imports
        .iter()
        .any(|import| owning_dependency(import, &dependencies).is_some()),
    )
  }

  /// Dependencies of `go_mod` whose resolved version differs from the base revision.
  pub fn changed_dependencies(
    &self,
    go_mod: &Path,
    cache: &ChangedDependencyCache,
  ) -> AffectedResult<Arc<BTreeSet<String>>> {
    cache.get_or_try_insert(go_mod, || {
      let current = read_versions(go_mod)?;
      let previous = self.read_versions_at_base(go_mod)?;
      let changed = manifest::changed_dependencies(&current, previous.as_ref());
      debug!(
        go_mod = %go_mod.display(),
        new_manifest = previous.is_none(),
        changed = changed.len(),
        "diffed module requirements"
      );
      Ok(changed)
    })
  }

  /// Version map of `go_mod` at the base revision; `None` if it did not exist there.
  fn read_versions_at_base(&self, go_mod: &Path) -> AffectedResult<Option<VersionMap>> {
    let go_mod = clean_path(go_mod);
    let relative = go_mod.strip_prefix(&self.repo_root).map_err(|_| {
      AffectedError::Config(ConfigError::OutsideRepository {
        path: go_mod.clone(),
        root: self.repo_root.clone(),
      })
    })?;

    let Some(data) = self
      .vcs
      .read_file_at_revision(&self.repo_root, &self.base_revision, relative)?
    else {
      return Ok(None);
    };
    let parsed = manifest::parse(&go_mod, &data)?;
    Ok(Some(parsed.resolve_versions()))
  }

  fn render(&self, changed: HashMap<&str, &Package>) -> AffectedResult<Vec<ChangedPackage>> {
    let mut results = changed
      .into_values()
      .map(|package| -> AffectedResult<ChangedPackage> {
        let dir = relative_dir(&self.repo_root, &package.dir).ok_or_else(|| {
          AffectedError::Config(ConfigError::OutsideRepository {
            path: package.dir.clone(),
            root: self.repo_root.clone(),
          })
        })?;
        Ok(ChangedPackage {
          dir,
          import_path: package.import_path.clone(),
        })
      })
      .collect::<AffectedResult<Vec<_>>>()?;

    results.sort_by(|a, b| a.import_path.cmp(&b.import_path));
    Ok(results)
  }
}

/// Version map of the go.mod currently in the working tree.
fn read_versions(go_mod: &Path) -> AffectedResult<VersionMap> {
  let data = std::fs::read(go_mod).with_context(|| format!("Failed to read {}", go_mod.display()))?;
  let parsed = manifest::parse(go_mod, &data)?;
  Ok(parsed.resolve_versions())
}

/// Convenience wrapper: construct a detector and run it once.
pub fn detect_changed_packages(
  vcs: &dyn VersionControl,
  loader: &dyn PackageLoader,
  options: DetectorOptions,
) -> AffectedResult<Vec<ChangedPackage>> {
  ChangeDetector::new(vcs, loader, options)?.detect_changed_packages()
}
