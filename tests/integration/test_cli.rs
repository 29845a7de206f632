//! Integration tests for the go-affected binary
//!
//! Only paths that never reach `go list` are exercised here, so no Go toolchain is needed.

use crate::helpers::{TestWorkspace, run_go_affected, run_go_affected_raw};
use anyhow::Result;

fn repo_root(ws: &TestWorkspace) -> String {
  ws.path.display().to_string()
}

#[test]
fn test_modules_from_go_work() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;
  ws.add_module("lib", "example.com/lib", &[])?;
  ws.add_module("experimental", "example.com/experimental", &[])?;
  ws.write_file("go.work", "go 1.22\n\nuse (\n\t./svc\n\t./lib\n)\n")?;

  let output = run_go_affected(&ws.path, &["modules", "--repo-root", &repo_root(&ws)])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert_eq!(stdout, "svc\nlib\n");
  Ok(())
}

#[test]
fn test_modules_discovered_from_go_mod_files() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc/api", "example.com/svc/api", &[])?;
  ws.add_module("lib", "example.com/lib", &[])?;
  ws.add_module("lib/vendor/x", "example.com/x", &[])?;

  let output = run_go_affected(&ws.path, &["modules", "--repo-root", &repo_root(&ws), "--json"])?;
  let roots: Vec<String> = serde_json::from_slice(&output.stdout)?;

  assert_eq!(roots, vec!["lib", "svc/api"]);
  Ok(())
}

#[test]
fn test_modules_flag_overrides_go_work() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;
  ws.write_file("go.work", "go 1.22\n\nuse ./svc\n")?;

  let output = run_go_affected(
    &ws.path,
    &["modules", "--repo-root", &repo_root(&ws), "--module", "tools"],
  )?;

  assert_eq!(String::from_utf8_lossy(&output.stdout), "tools\n");
  Ok(())
}

#[test]
fn test_detect_dry_run_lists_changed_files() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;
  ws.write_file("svc/main.go", "package main\n")?;
  ws.commit("Add svc")?;
  ws.write_file("svc/main.go", "package main\n\nfunc main() {}\n")?;
  ws.commit("Implement main")?;

  let output = run_go_affected(&ws.path, &["detect", "--repo-root", &repo_root(&ws), "--dry-run"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("1 changed files since HEAD~"), "got: {}", stdout);
  assert!(stdout.contains("  - svc/main.go"), "got: {}", stdout);
  assert!(stdout.contains("Would list packages in 1 module roots"), "got: {}", stdout);
  Ok(())
}

#[test]
fn test_detect_uses_base_from_config() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;
  ws.commit("Add svc")?;
  git_tag(&ws, "baseline")?;
  ws.write_file("svc/a.go", "package svc\n")?;
  ws.commit("Add a")?;
  ws.write_file("svc/b.go", "package svc\n")?;
  ws.commit("Add b")?;
  ws.write_file("go-affected.toml", "[detect]\nbase = \"baseline\"\n")?;

  let output = run_go_affected(&ws.path, &["detect", "--repo-root", &repo_root(&ws), "--dry-run"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("changed files since baseline"), "got: {}", stdout);
  assert!(stdout.contains("svc/a.go") && stdout.contains("svc/b.go"), "got: {}", stdout);

  // Positional base wins over config
  let output = run_go_affected(
    &ws.path,
    &["detect", "HEAD~", "--repo-root", &repo_root(&ws), "--dry-run"],
  )?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("1 changed files since HEAD~"), "got: {}", stdout);
  Ok(())
}

#[test]
fn test_invalid_config_is_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;
  ws.write_file("go-affected.toml", "[detect]\npropagation = \"eventual\"\n")?;

  let output = run_go_affected_raw(&ws.path, &["modules", "--repo-root", &repo_root(&ws)])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("go-affected.toml"));
  Ok(())
}

#[test]
fn test_unknown_format_is_rejected() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;

  let output = run_go_affected_raw(
    &ws.path,
    &["detect", "--repo-root", &repo_root(&ws), "--format", "yaml"],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown format 'yaml'"));
  Ok(())
}

#[test]
fn test_unknown_base_is_system_error() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;

  let output = run_go_affected_raw(
    &ws.path,
    &["detect", "no-such-rev", "--repo-root", &repo_root(&ws), "--dry-run"],
  )?;

  assert_eq!(output.status.code(), Some(2));
  assert!(String::from_utf8_lossy(&output.stderr).contains("git diff --name-only no-such-rev"));
  Ok(())
}

fn git_tag(ws: &TestWorkspace, name: &str) -> Result<()> {
  crate::helpers::git(&ws.path, &["tag", name])?;
  Ok(())
}
