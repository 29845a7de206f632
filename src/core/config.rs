use crate::core::error::{AffectedResult, ConfigError, ResultExt};
use crate::golang::workspace::{find_module_roots, read_workspace};
use crate::graph::Propagation;
use crate::utils::absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Configuration for go-affected
/// Searched in order: go-affected.toml, .go-affected.toml, .config/go-affected.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffectedConfig {
  #[serde(default)]
  pub detect: DetectConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
  /// Revision to compare the working tree against (default: "HEAD~")
  #[serde(default = "default_base")]
  pub base: String,

  /// "transitive" (default) or "single-pass"
  #[serde(default)]
  pub propagation: Propagation,

  /// Per git / go subprocess, in seconds; 0 disables (default: 120)
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,

  /// Workspace manifest listing module roots, relative to the repository root
  #[serde(default)]
  pub go_work: Option<PathBuf>,

  /// Explicit module roots, relative to the repository root
  /// Takes precedence over go_work and go.mod discovery
  #[serde(default)]
  pub modules: Vec<PathBuf>,
}

fn default_base() -> String {
  "HEAD~".to_string()
}

fn default_timeout_secs() -> u64 {
  120
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      base: default_base(),
      propagation: Propagation::default(),
      timeout_secs: default_timeout_secs(),
      go_work: None,
      modules: Vec::new(),
    }
  }
}

impl DetectConfig {
  /// Validate detect configuration
  pub fn validate(&self) -> AffectedResult<()> {
    validate_base(&self.base)?;
    Ok(())
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// A base revision must be non-empty and must not look like a git option.
pub fn validate_base(base: &str) -> AffectedResult<()> {
  if base.trim().is_empty() {
    return Err(
      ConfigError::InvalidValue {
        field: "base".to_string(),
        reason: "must not be empty".to_string(),
      }
      .into(),
    );
  }
  if base.starts_with('-') {
    return Err(
      ConfigError::InvalidValue {
        field: "base".to_string(),
        reason: format!("'{}' looks like a command-line option", base),
      }
      .into(),
    );
  }
  Ok(())
}

impl AffectedConfig {
  /// Find config file in search order
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("go-affected.toml"),
      path.join(".go-affected.toml"),
      path.join(".config").join("go-affected.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from the repository root, falling back to defaults when no file exists
  pub fn load(repo_root: &Path) -> AffectedResult<Self> {
    let Some(config_path) = Self::find_config_path(repo_root) else {
      debug!(root = %repo_root.display(), "no config file, using defaults");
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    Self::parse(&config_path, &content)
  }

  /// Parse and validate config content
  pub fn parse(config_path: &Path, content: &str) -> AffectedResult<Self> {
    let config: AffectedConfig = toml_edit::de::from_str(content).map_err(|e| ConfigError::ParseFailed {
      path: config_path.to_path_buf(),
      reason: e.to_string(),
    })?;

    config
      .detect
      .validate()
      .with_context(|| format!("Invalid detect configuration in {}", config_path.display()))?;

    Ok(config)
  }
}

/// Where module roots come from, highest precedence first
#[derive(Debug, Clone, Default)]
pub struct ModuleSources {
  /// `--module` values (relative to the repository root)
  pub explicit: Vec<PathBuf>,
  /// `--go-work` value (relative to the current directory)
  pub go_work: Option<PathBuf>,
}

/// Resolve module roots: explicit list, then config `modules`, then a go.work
/// file (flag, config, or `<root>/go.work`), then every go.mod under the root.
pub fn resolve_module_roots(repo_root: &Path, config: &AffectedConfig, sources: &ModuleSources) -> AffectedResult<Vec<PathBuf>> {
  let roots = if !sources.explicit.is_empty() {
    sources.explicit.iter().map(|p| absolutize(repo_root, p)).collect()
  } else if !config.detect.modules.is_empty() {
    config.detect.modules.iter().map(|p| absolutize(repo_root, p)).collect()
  } else if let Some(go_work) = go_work_path(repo_root, config, sources)? {
    debug!(go_work = %go_work.display(), "reading module roots from workspace manifest");
    read_workspace(&go_work)?
  } else {
    find_module_roots(repo_root)?
  };

  if roots.is_empty() {
    return Err(
      ConfigError::NoModules {
        root: repo_root.to_path_buf(),
      }
      .into(),
    );
  }

  for root in &roots {
    if !root.starts_with(repo_root) {
      return Err(
        ConfigError::OutsideRepository {
          path: root.clone(),
          root: repo_root.to_path_buf(),
        }
        .into(),
      );
    }
  }

  Ok(roots)
}

fn go_work_path(repo_root: &Path, config: &AffectedConfig, sources: &ModuleSources) -> AffectedResult<Option<PathBuf>> {
  if let Some(path) = &sources.go_work {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    return Ok(Some(absolutize(&cwd, path)));
  }
  if let Some(path) = &config.detect.go_work {
    return Ok(Some(absolutize(repo_root, path)));
  }
  let default = repo_root.join("go.work");
  Ok(default.is_file().then_some(default))
}
