//! Longest-prefix module ownership
//!
//! An import path such as `example.com/org/repo/pkg/sub` belongs to whichever
//! module path is its longest `/`-delimited prefix. Without a full module index
//! we walk the candidates from longest to shortest and stop at the first one
//! present in the set of changed dependencies.

use std::collections::BTreeSet;

/// Candidate owning-module paths of `import_path`, longest first.
///
/// `"a/b/c"` yields `"a/b/c"`, `"a/b"`, `"a"`. Empty segments produced by a
/// leading slash are skipped; an empty path yields nothing.
pub fn path_prefixes(import_path: &str) -> impl Iterator<Item = &str> {
  std::iter::successors(Some(import_path), |path| path.rsplit_once('/').map(|(head, _)| head))
    .filter(|path| !path.is_empty())
}

/// The longest prefix of `import_path` found in `dependencies`, if any.
pub fn owning_dependency<'a>(import_path: &str, dependencies: &'a BTreeSet<String>) -> Option<&'a str> {
  if dependencies.is_empty() {
    return None;
  }
  path_prefixes(import_path).find_map(|candidate| dependencies.get(candidate).map(String::as_str))
}
