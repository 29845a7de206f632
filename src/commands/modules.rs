//! `go-affected modules` - List the module roots a detect run would scan

use crate::core::config::{ModuleSources, resolve_module_roots};
use crate::core::context::RepoContext;
use crate::core::error::AffectedResult;
use crate::utils::relative_dir;
use std::path::{Path, PathBuf};

/// Run the modules command
pub fn run_modules(ctx: &RepoContext, sources: ModuleSources, json: bool) -> AffectedResult<()> {
  let roots = resolve_module_roots(ctx.repo_root(), &ctx.config, &sources)?;
  let relative = relative_roots(ctx.repo_root(), &roots);

  if json {
    println!("{}", serde_json::to_string_pretty(&relative)?);
  } else {
    for root in &relative {
      println!("{}", root.display());
    }
  }
  Ok(())
}

/// Module roots relative to the repository root; resolution guarantees they are inside it.
fn relative_roots(repo_root: &Path, roots: &[PathBuf]) -> Vec<PathBuf> {
  roots
    .iter()
    .map(|root| relative_dir(repo_root, root).unwrap_or_else(|| root.clone()))
    .collect()
}
