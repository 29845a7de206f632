//! Module root discovery: go.work `use` directives or a go.mod directory walk

use crate::core::error::{AffectedError, AffectedResult, ManifestError, ResultExt};
use crate::utils::absolutize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never searched for go.mod files
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata", "node_modules"];

/// Read a go.work file and return its `use` directories as absolute paths.
///
/// Relative `use` paths are resolved against the directory holding go.work.
pub fn read_workspace(go_work: &Path) -> AffectedResult<Vec<PathBuf>> {
  let data = fs::read(go_work).with_context(|| format!("Failed to read {}", go_work.display()))?;
  let uses = parse_workspace(go_work, &data)?;
  let base = go_work.parent().unwrap_or_else(|| Path::new("."));
  Ok(uses.iter().map(|dir| absolutize(base, Path::new(dir))).collect())
}

/// Parse go.work content and return the raw `use` paths in file order.
pub fn parse_workspace(path: &Path, data: &[u8]) -> Result<Vec<String>, ManifestError> {
  let error = |line: usize, reason: String| ManifestError::Parse {
    path: path.to_path_buf(),
    line,
    reason,
  };

  let text = std::str::from_utf8(data).map_err(|e| error(0, format!("invalid UTF-8: {}", e)))?;
  let mut uses = Vec::new();
  let mut block: Option<(String, usize)> = None;

  for (idx, raw) in text.lines().enumerate() {
    let number = idx + 1;
    let line = raw.split("//").next().unwrap_or("").trim();
    if line.is_empty() {
      continue;
    }

    if let Some((verb, _)) = &block {
      if line == ")" {
        block = None;
      } else if verb == "use" {
        uses.push(unquote(line).map_err(|reason| error(number, reason))?);
      }
      continue;
    }

    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match verb {
      "go" | "toolchain" | "godebug" | "replace" | "use" if rest == "(" => {
        block = Some((verb.to_string(), number));
      }
      "use" if rest.is_empty() => return Err(error(number, "usage: use local/dir".to_string())),
      "use" => uses.push(unquote(rest).map_err(|reason| error(number, reason))?),
      "go" | "toolchain" | "godebug" | "replace" => {}
      other => return Err(error(number, format!("unknown directive: {}", other))),
    }
  }

  if let Some((verb, opened_at)) = block {
    return Err(error(opened_at, format!("unterminated {} block", verb)));
  }

  Ok(uses)
}

fn unquote(token: &str) -> Result<String, String> {
  let token = token.trim();
  for quote in ['"', '`'] {
    if let Some(inner) = token.strip_prefix(quote) {
      return inner
        .strip_suffix(quote)
        .map(str::to_string)
        .ok_or_else(|| "unterminated quoted string".to_string());
    }
  }
  if token.split_whitespace().count() != 1 {
    return Err(format!("unexpected tokens in use path: {}", token));
  }
  Ok(token.to_string())
}

/// Every directory under `root` that contains a go.mod, sorted.
///
/// Hidden directories (`.git`, `.cache`, ...), vendor trees and testdata are skipped.
pub fn find_module_roots(root: &Path) -> AffectedResult<Vec<PathBuf>> {
  let mut roots = Vec::new();
  let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|entry| {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
      return true;
    }
    let name = entry.file_name().to_string_lossy();
    !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
  });

  for entry in walker {
    let entry = entry.map_err(|e| AffectedError::message(format!("Failed to walk {}: {}", root.display(), e)))?;
    if entry.file_type().is_file()
      && entry.file_name() == "go.mod"
      && let Some(dir) = entry.path().parent()
    {
      roots.push(dir.to_path_buf());
    }
  }

  roots.sort();
  Ok(roots)
}
