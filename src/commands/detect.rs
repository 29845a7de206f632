//! `go-affected detect` - Show which Go packages are affected by changes
//!
//! Diffs the working tree against a base revision and reports:
//! - Packages that directly contain changed files
//! - Packages importing an affected package
//! - Packages importing a third-party module whose resolved version changed

use crate::core::config::{ModuleSources, resolve_module_roots, validate_base};
use crate::core::context::RepoContext;
use crate::core::error::{AffectedError, AffectedResult};
use crate::golang::GoListLoader;
use crate::graph::{ChangeDetector, ChangedPackage, DetectorOptions, Propagation};
use crate::utils::relative_dir;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Output format for the detect command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  /// `<dir> <import path>` per line
  Text,
  Json,
  /// Import paths only
  Names,
}

impl FromStr for OutputFormat {
  type Err = AffectedError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "text" => Ok(Self::Text),
      "json" => Ok(Self::Json),
      "names" | "names-only" => Ok(Self::Names),
      _ => Err(AffectedError::with_help(
        format!("Unknown format '{}'", s),
        "Valid formats: text, json, names",
      )),
    }
  }
}

/// Flags of the detect command; `None` falls back to go-affected.toml.
#[derive(Debug, Clone, Default)]
pub struct DetectArgs {
  pub base: Option<String>,
  pub modules: ModuleSources,
  pub format: Option<String>,
  pub propagation: Option<Propagation>,
  pub dry_run: bool,
}

/// Run the detect command
pub fn run_detect(ctx: &RepoContext, args: DetectArgs) -> AffectedResult<()> {
  let format = match &args.format {
    Some(format) => format.parse()?,
    None => OutputFormat::Text,
  };
  let base = args.base.unwrap_or_else(|| ctx.config.detect.base.clone());
  validate_base(&base)?;
  let propagation = args.propagation.unwrap_or(ctx.config.detect.propagation);
  let module_roots = resolve_module_roots(ctx.repo_root(), &ctx.config, &args.modules)?;

  let git = ctx.git();
  let loader = GoListLoader::new(ctx.cancel.clone());
  let detector = ChangeDetector::new(
    &git,
    &loader,
    DetectorOptions {
      repo_root: Some(ctx.root.clone()),
      base_revision: base.clone(),
      module_roots: module_roots.clone(),
      propagation,
    },
  )?;

  if args.dry_run {
    print!("{}", render_plan(detector.repo_root(), &base, &detector.changed_files(), &module_roots));
    return Ok(());
  }

  let results = detector.detect_changed_packages()?;
  info!(count = results.len(), base = %base, "detection finished");
  print!("{}", render_results(&results, format)?);
  Ok(())
}

/// Render detection results in the requested format.
pub fn render_results(results: &[ChangedPackage], format: OutputFormat) -> AffectedResult<String> {
  let mut out = String::new();
  match format {
    OutputFormat::Text => {
      for package in results {
        let _ = writeln!(out, "{} {}", package.dir.display(), package.import_path);
      }
    }
    OutputFormat::Json => {
      out = serde_json::to_string_pretty(results)?;
      out.push('\n');
    }
    OutputFormat::Names => {
      for package in results {
        let _ = writeln!(out, "{}", package.import_path);
      }
    }
  }
  Ok(out)
}

fn render_plan(root: &Path, base: &str, changed_files: &[&Path], module_roots: &[PathBuf]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "DRY RUN: {} changed files since {}", changed_files.len(), base);
  for file in changed_files {
    let shown = file.strip_prefix(root).unwrap_or(file);
    let _ = writeln!(out, "  - {}", shown.display());
  }
  let _ = writeln!(out, "Would list packages in {} module roots", module_roots.len());
  for module_root in module_roots {
    let shown = relative_dir(root, module_root).unwrap_or_else(|| module_root.clone());
    let _ = writeln!(out, "  - {}", shown.display());
  }
  out
}
