//! go.mod parsing and dependency version resolution
//!
//! Only what the detector needs is kept from a manifest: the `require` list and
//! the `replace` rules. The remaining directives are still checked for shape so
//! malformed files fail loudly instead of yielding an empty version map.
//!
//! # Resolution
//!
//! Each requirement `(path, version)` resolves to a token `"<path>@<version>"`:
//! 1. a replace keyed by the exact `(path, version)` wins,
//! 2. otherwise a version-less replace keyed by `path` applies; when its
//!    target has no version the requirement's version is kept,
//! 3. otherwise the requirement is used unchanged.
//!
//! The map is keyed by the *original* requirement path so that two revisions of
//! the same manifest always compare entry by entry.

use crate::core::error::ManifestError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Dependency path → resolved `"path@version"` token
pub type VersionMap = BTreeMap<String, String>;

/// A module path with an optional version (empty string when absent)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleVersion {
  pub path: String,
  pub version: String,
}

impl ModuleVersion {
  pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      version: version.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
  pub module: ModuleVersion,
  /// Marked `// indirect`
  pub indirect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
  pub old: ModuleVersion,
  pub new: ModuleVersion,
}

/// The parsed content of one go.mod file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
  pub module: Option<String>,
  pub go_version: Option<String>,
  pub toolchain: Option<String>,
  pub requires: Vec<Requirement>,
  pub replaces: Vec<Replacement>,
  pub excludes: Vec<ModuleVersion>,
}

impl GoMod {
  /// Resolve every requirement through the replace rules.
  pub fn resolve_versions(&self) -> VersionMap {
    let mut replace_map: HashMap<&ModuleVersion, &ModuleVersion> = HashMap::with_capacity(self.replaces.len());
    for replace in &self.replaces {
      // Later rules for the same key win
      replace_map.insert(&replace.old, &replace.new);
    }

    let mut versions = VersionMap::new();
    for req in &self.requires {
      let module = &req.module;
      let mut replacement = replace_map.get(module).copied();
      if replacement.is_none() && !module.version.is_empty() {
        replacement = replace_map.get(&ModuleVersion::new(module.path.clone(), "")).copied();
      }

      let token = match replacement {
        Some(new) if !new.version.is_empty() => format!("{}@{}", new.path, new.version),
        Some(new) => format!("{}@{}", new.path, module.version),
        None => format!("{}@{}", module.path, module.version),
      };
      versions.insert(module.path.clone(), token);
    }
    versions
  }
}

/// Dependency paths whose resolved token differs between two revisions.
///
/// `previous` is `None` when the manifest did not exist at the base revision,
/// in which case every current dependency counts as changed. Dependencies that
/// disappeared are not reported: no current package can import them.
pub fn changed_dependencies(current: &VersionMap, previous: Option<&VersionMap>) -> BTreeSet<String> {
  current
    .iter()
    .filter(|(path, token)| previous.and_then(|prev| prev.get(*path)) != Some(*token))
    .map(|(path, _)| path.clone())
    .collect()
}

/// Parse go.mod content. `path` is only used to label errors.
pub fn parse(path: &Path, data: &[u8]) -> Result<GoMod, ManifestError> {
  Parser::new(path).parse(data)
}

/// Whether a replace target is a filesystem path rather than a module path.
pub fn is_directory_path(path: &str) -> bool {
  path == "."
    || path == ".."
    || path.starts_with("./")
    || path.starts_with("../")
    || path.starts_with('/')
    || path.starts_with(".\\")
    || path.starts_with("..\\")
    || path.starts_with('\\')
    || (path.len() >= 3
      && path.as_bytes()[0].is_ascii_alphabetic()
      && path.as_bytes()[1] == b':'
      && (path.as_bytes()[2] == b'\\' || path.as_bytes()[2] == b'/'))
}

/// Canonical form of a module version, or `None` if it is not one.
///
/// Shorthand `v1` and `v1.2` expand to `v1.0.0` and `v1.2.0`. Build metadata is
/// dropped except `+incompatible`. Pseudo-versions are already canonical.
pub fn canonical_version(version: &str) -> Option<String> {
  let rest = version.strip_prefix('v')?;
  let full = match rest.split('.').collect::<Vec<_>>().as_slice() {
    [major] if numeric(major) => format!("{}.0.0", major),
    [major, minor] if numeric(major) && numeric(minor) => format!("{}.{}.0", major, minor),
    _ => rest.to_string(),
  };

  let parsed = semver::Version::parse(&full).ok()?;
  let mut canonical = format!("v{}.{}.{}", parsed.major, parsed.minor, parsed.patch);
  if !parsed.pre.is_empty() {
    canonical.push('-');
    canonical.push_str(parsed.pre.as_str());
  }
  if parsed.build.as_str() == "incompatible" {
    canonical.push_str("+incompatible");
  }
  Some(canonical)
}

fn numeric(part: &str) -> bool {
  !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// One lexical line of a go.mod file
#[derive(Debug)]
struct Line {
  number: usize,
  tokens: Vec<String>,
  comment: String,
}

struct Parser {
  path: PathBuf,
  gomod: GoMod,
}

impl Parser {
  fn new(path: &Path) -> Self {
    Self {
      path: path.to_path_buf(),
      gomod: GoMod::default(),
    }
  }

  fn error(&self, line: usize, reason: impl Into<String>) -> ManifestError {
    ManifestError::Parse {
      path: self.path.clone(),
      line,
      reason: reason.into(),
    }
  }

  fn parse(mut self, data: &[u8]) -> Result<GoMod, ManifestError> {
    let text = std::str::from_utf8(data).map_err(|e| self.error(0, format!("invalid UTF-8: {}", e)))?;

    let mut lines = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
      let line = lex_line(raw, idx + 1).map_err(|reason| self.error(idx + 1, reason))?;
      if !line.tokens.is_empty() {
        lines.push(line);
      }
    }

    let mut iter = lines.into_iter();
    while let Some(line) = iter.next() {
      let verb = line.tokens[0].clone();
      let is_block = line.tokens.len() >= 2 && line.tokens[1] == "(";

      if !is_block {
        self.directive(&verb, &line.tokens[1..], &line)?;
        continue;
      }

      if !matches!(
        verb.as_str(),
        "require" | "replace" | "exclude" | "retract" | "godebug" | "tool" | "ignore"
      ) {
        return Err(self.error(line.number, format!("unknown block type: {}", verb)));
      }
      match &line.tokens[2..] {
        [] => {}
        [close] if close == ")" => continue,
        _ => return Err(self.error(line.number, "unexpected tokens after '('")),
      }

      let opened_at = line.number;
      let mut closed = false;
      for entry in iter.by_ref() {
        if entry.tokens.len() == 1 && entry.tokens[0] == ")" {
          closed = true;
          break;
        }
        self.directive(&verb, &entry.tokens, &entry)?;
      }
      if !closed {
        return Err(self.error(opened_at, format!("unterminated {} block", verb)));
      }
    }

    Ok(self.gomod)
  }

  fn directive(&mut self, verb: &str, args: &[String], line: &Line) -> Result<(), ManifestError> {
    let n = line.number;
    match verb {
      "module" => {
        let [path] = args else {
          return Err(self.error(n, "usage: module module/path"));
        };
        if self.gomod.module.is_some() {
          return Err(self.error(n, "repeated module statement"));
        }
        self.gomod.module = Some(path.clone());
      }
      "go" => {
        let [version] = args else {
          return Err(self.error(n, "usage: go 1.23"));
        };
        self.gomod.go_version = Some(version.clone());
      }
      "toolchain" => {
        let [name] = args else {
          return Err(self.error(n, "usage: toolchain go1.23.1"));
        };
        self.gomod.toolchain = Some(name.clone());
      }
      "require" | "exclude" => {
        let [path, version] = args else {
          return Err(self.error(n, format!("usage: {} module/path v1.2.3", verb)));
        };
        let Some(version) = canonical_version(version) else {
          return Err(self.error(n, format!("invalid module version {:?} for {}", version, path)));
        };
        let module = ModuleVersion::new(path.clone(), version);
        if verb == "require" {
          let indirect = line.comment.split_whitespace().next() == Some("indirect")
            || line.comment.trim_start().starts_with("indirect;");
          self.gomod.requires.push(Requirement { module, indirect });
        } else {
          self.gomod.excludes.push(module);
        }
      }
      "replace" => {
        let replacement = self.replacement(args, n)?;
        self.gomod.replaces.push(replacement);
      }
      // Shape is irrelevant to dependency resolution
      "retract" | "godebug" | "tool" | "ignore" => {
        if args.is_empty() {
          return Err(self.error(n, format!("usage: {} ...", verb)));
        }
      }
      other => return Err(self.error(n, format!("unknown directive: {}", other))),
    }
    Ok(())
  }

  fn replacement(&self, args: &[String], n: usize) -> Result<Replacement, ManifestError> {
    let arrow = args
      .iter()
      .position(|t| t == "=>")
      .ok_or_else(|| self.error(n, "usage: replace module/path [v1.2.3] => other/module v1.4.5 | dir"))?;
    let (lhs, rhs) = (&args[..arrow], &args[arrow + 1..]);

    let old = match lhs {
      [path] => ModuleVersion::new(path.clone(), ""),
      [path, version] => ModuleVersion::new(path.clone(), self.version(path, version, n)?),
      _ => return Err(self.error(n, "replace: expected module path and optional version before '=>'")),
    };

    let new = match rhs {
      [path] if is_directory_path(path) => ModuleVersion::new(path.clone(), ""),
      [path] => {
        return Err(self.error(
          n,
          format!("replacement module without version must be directory path (rooted or starting with ./ or ../): {}", path),
        ));
      }
      [path, _] if is_directory_path(path) => {
        return Err(self.error(n, format!("replacement directory {} cannot carry a version", path)));
      }
      [path, version] => ModuleVersion::new(path.clone(), self.version(path, version, n)?),
      _ => return Err(self.error(n, "replace: expected module path and optional version after '=>'")),
    };

    Ok(Replacement { old, new })
  }

  fn version(&self, path: &str, version: &str, n: usize) -> Result<String, ManifestError> {
    canonical_version(version).ok_or_else(|| self.error(n, format!("invalid module version {:?} for {}", version, path)))
  }
}

/// Split one line into tokens and its trailing `//` comment.
fn lex_line(raw: &str, number: usize) -> Result<Line, String> {
  let mut tokens = Vec::new();
  let mut comment = String::new();
  let mut chars = raw.char_indices().peekable();

  while let Some(&(idx, c)) = chars.peek() {
    match c {
      c if c.is_whitespace() => {
        chars.next();
      }
      '/' if raw[idx..].starts_with("//") => {
        comment = raw[idx + 2..].trim().to_string();
        break;
      }
      '(' | ')' => {
        tokens.push(c.to_string());
        chars.next();
      }
      '=' if raw[idx..].starts_with("=>") => {
        tokens.push("=>".to_string());
        chars.next();
        chars.next();
      }
      '"' => {
        chars.next();
        let mut token = String::new();
        let mut terminated = false;
        while let Some((_, c)) = chars.next() {
          match c {
            '"' => {
              terminated = true;
              break;
            }
            '\\' => match chars.next() {
              Some((_, escaped)) => token.push(escaped),
              None => break,
            },
            other => token.push(other),
          }
        }
        if !terminated {
          return Err("unterminated quoted string".to_string());
        }
        tokens.push(token);
      }
      '`' => {
        chars.next();
        let mut token = String::new();
        let mut terminated = false;
        for (_, c) in chars.by_ref() {
          if c == '`' {
            terminated = true;
            break;
          }
          token.push(c);
        }
        if !terminated {
          return Err("unterminated raw string".to_string());
        }
        tokens.push(token);
      }
      _ => {
        let start = idx;
        let mut end = raw.len();
        while let Some(&(i, c)) = chars.peek() {
          if c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == '`' || raw[i..].starts_with("//") {
            end = i;
            break;
          }
          chars.next();
        }
        tokens.push(raw[start..end].to_string());
      }
    }
  }

  Ok(Line {
    number,
    tokens,
    comment,
  })
}
