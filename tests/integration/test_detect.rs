//! Detection against real git history with an in-memory package listing

use crate::helpers::{StaticLoader, TestWorkspace};
use anyhow::Result;
use go_affected::core::error::{AffectedError, ConfigError, VcsError};
use go_affected::core::vcs::SystemGit;
use go_affected::{ChangedPackage, DetectorOptions, Propagation, detect_changed_packages};
use std::path::PathBuf;

fn options(ws: &TestWorkspace, base: &str, modules: &[&str]) -> DetectorOptions {
  DetectorOptions {
    repo_root: Some(ws.path.clone()),
    base_revision: base.to_string(),
    module_roots: modules.iter().map(PathBuf::from).collect(),
    propagation: Propagation::Transitive,
  }
}

fn import_paths(results: &[ChangedPackage]) -> Vec<&str> {
  results.iter().map(|p| p.import_path.as_str()).collect()
}

/// Root module `example.com/mono` with core <- api, plus an unrelated tools package
fn mono_workspace() -> Result<TestWorkspace> {
  let ws = TestWorkspace::new()?;
  ws.add_module(".", "example.com/mono", &[("github.com/lib/pq", "v1.10.7")])?;
  ws.write_file("core/core.go", "package core\n")?;
  ws.write_file("api/api.go", "package api\n")?;
  ws.write_file("tools/tools.go", "package tools\n")?;
  ws.commit("Add mono module")?;
  Ok(ws)
}

fn mono_loader(ws: &TestWorkspace) -> StaticLoader {
  StaticLoader {
    packages: vec![
      ws.package(".", "core", "example.com/mono/core", &["core.go"], &["fmt"]),
      ws.package(".", "api", "example.com/mono/api", &["api.go"], &["example.com/mono/core"]),
      ws.package(".", "tools", "example.com/mono/tools", &["tools.go"], &["github.com/lib/pq"]),
    ],
  }
}

#[test]
fn test_committed_change_affects_importers() -> Result<()> {
  let ws = mono_workspace()?;
  ws.write_file("core/core.go", "package core\n\nfunc Hello() {}\n")?;
  ws.commit("Modify core")?;

  let results = detect_changed_packages(&SystemGit::default(), &mono_loader(&ws), options(&ws, "HEAD~", &["."]))?;

  assert_eq!(
    results,
    vec![
      ChangedPackage {
        dir: PathBuf::from("api"),
        import_path: "example.com/mono/api".to_string(),
      },
      ChangedPackage {
        dir: PathBuf::from("core"),
        import_path: "example.com/mono/core".to_string(),
      },
    ]
  );
  Ok(())
}

#[test]
fn test_uncommitted_change_is_detected() -> Result<()> {
  let ws = mono_workspace()?;
  ws.write_file("tools/tools.go", "package tools\n\n// wip\n")?;

  let results = detect_changed_packages(&SystemGit::default(), &mono_loader(&ws), options(&ws, "HEAD", &["."]))?;

  assert_eq!(import_paths(&results), vec!["example.com/mono/tools"]);
  Ok(())
}

#[test]
fn test_no_changes_yields_empty_result() -> Result<()> {
  let ws = mono_workspace()?;

  let results = detect_changed_packages(&SystemGit::default(), &mono_loader(&ws), options(&ws, "HEAD", &["."]))?;

  assert!(results.is_empty(), "expected no affected packages, got {:?}", results);
  Ok(())
}

#[test]
fn test_dependency_bump_affects_importers() -> Result<()> {
  let ws = mono_workspace()?;
  ws.add_module(".", "example.com/mono", &[("github.com/lib/pq", "v1.10.9")])?;
  ws.commit("Bump pq")?;

  let results = detect_changed_packages(&SystemGit::default(), &mono_loader(&ws), options(&ws, "HEAD~", &["."]))?;

  assert_eq!(import_paths(&results), vec!["example.com/mono/tools"]);
  Ok(())
}

#[test]
fn test_replace_directive_change_affects_importers() -> Result<()> {
  let ws = mono_workspace()?;
  let go_mod = ws.path.join("go.mod");
  let mut content = std::fs::read_to_string(&go_mod)?;
  content.push_str("\nreplace github.com/lib/pq => github.com/fork/pq v1.10.7\n");
  std::fs::write(&go_mod, content)?;
  ws.commit("Use forked pq")?;

  let results = detect_changed_packages(&SystemGit::default(), &mono_loader(&ws), options(&ws, "HEAD~", &["."]))?;

  assert_eq!(import_paths(&results), vec!["example.com/mono/tools"]);
  Ok(())
}

#[test]
fn test_manifest_added_since_base_marks_all_dependencies() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("svc/worker/worker.go", "package worker\n")?;
  ws.write_file("svc/plain/plain.go", "package plain\n")?;
  ws.commit("Add sources")?;
  ws.add_module("svc", "example.com/svc", &[("golang.org/x/sync", "v0.7.0")])?;
  ws.commit("Add svc module")?;

  let loader = StaticLoader {
    packages: vec![
      ws.package(
        "svc",
        "svc/worker",
        "example.com/svc/worker",
        &["worker.go"],
        &["golang.org/x/sync/errgroup"],
      ),
      ws.package("svc", "svc/plain", "example.com/svc/plain", &["plain.go"], &["strings"]),
    ],
  };

  let results = detect_changed_packages(&SystemGit::default(), &loader, options(&ws, "HEAD~", &["svc"]))?;

  assert_eq!(
    results,
    vec![ChangedPackage {
      dir: PathBuf::from("svc/worker"),
      import_path: "example.com/svc/worker".to_string(),
    }]
  );
  Ok(())
}

#[test]
fn test_multiple_modules() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("lib", "example.com/lib", &[])?;
  ws.add_module("svc", "example.com/svc", &[])?;
  ws.write_file("lib/strutil/strutil.go", "package strutil\n")?;
  ws.write_file("svc/server/server.go", "package server\n")?;
  ws.commit("Add modules")?;
  ws.write_file("svc/server/server.go", "package server\n\n// changed\n")?;
  ws.commit("Touch server")?;

  let loader = StaticLoader {
    packages: vec![
      ws.package("lib", "lib/strutil", "example.com/lib/strutil", &["strutil.go"], &[]),
      ws.package(
        "svc",
        "svc/server",
        "example.com/svc/server",
        &["server.go"],
        &["example.com/lib/strutil"],
      ),
    ],
  };

  let results = detect_changed_packages(&SystemGit::default(), &loader, options(&ws, "HEAD~", &["lib", "svc"]))?;

  assert_eq!(import_paths(&results), vec!["example.com/svc/server"]);
  Ok(())
}

#[test]
fn test_unknown_base_revision_fails() -> Result<()> {
  let ws = mono_workspace()?;

  let err = detect_changed_packages(
    &SystemGit::default(),
    &mono_loader(&ws),
    options(&ws, "does-not-exist", &["."]),
  )
  .unwrap_err();

  assert!(
    matches!(err, AffectedError::Vcs(VcsError::CommandFailed { .. })),
    "unexpected error: {:?}",
    err
  );
  Ok(())
}

#[test]
fn test_detection_is_idempotent() -> Result<()> {
  let ws = mono_workspace()?;
  ws.write_file("core/core.go", "package core\n\n// v2\n")?;
  ws.add_module(".", "example.com/mono", &[("github.com/lib/pq", "v1.10.9")])?;
  ws.commit("Change core and bump pq")?;

  let git = SystemGit::default();
  let loader = mono_loader(&ws);
  let first = detect_changed_packages(&git, &loader, options(&ws, "HEAD~", &["."]))?;
  let second = detect_changed_packages(&git, &loader, options(&ws, "HEAD~", &["."]))?;

  assert_eq!(first, second);
  assert_eq!(
    import_paths(&first),
    vec!["example.com/mono/api", "example.com/mono/core", "example.com/mono/tools"]
  );
  Ok(())
}

#[cfg(unix)]
#[test]
fn test_symlinked_repo_root_finds_changes() -> Result<()> {
  let ws = mono_workspace()?;
  ws.write_file("core/core.go", "package core\n\n// v2\n")?;
  ws.commit("Modify core")?;

  let links = tempfile::TempDir::new()?;
  let link = links.path().join("mono");
  std::os::unix::fs::symlink(&ws.path, &link)?;

  let mut opts = options(&ws, "HEAD~", &["."]);
  opts.repo_root = Some(link);
  let results = detect_changed_packages(&SystemGit::default(), &mono_loader(&ws), opts)?;

  assert_eq!(import_paths(&results), vec!["example.com/mono/api", "example.com/mono/core"]);
  Ok(())
}

#[test]
fn test_subdirectory_repo_root_is_rejected() -> Result<()> {
  let ws = mono_workspace()?;

  let mut opts = options(&ws, "HEAD", &["."]);
  opts.repo_root = Some(ws.path.join("core"));
  let err = detect_changed_packages(&SystemGit::default(), &mono_loader(&ws), opts).unwrap_err();

  assert!(
    matches!(err, AffectedError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "repo_root"),
    "unexpected error: {:?}",
    err
  );
  Ok(())
}
