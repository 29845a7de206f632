//! SystemGit against a real repository

use crate::helpers::TestWorkspace;
use anyhow::Result;
use go_affected::core::vcs::{SystemGit, VersionControl};
use std::path::{Path, PathBuf};

#[test]
fn test_repository_root_from_subdirectory() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("nested/deep/file.txt", "x\n")?;

  let root = SystemGit::default().repository_root(&ws.path.join("nested/deep"))?;

  assert_eq!(root.canonicalize()?, ws.path.canonicalize()?);
  Ok(())
}

#[test]
fn test_changed_files_are_repository_relative() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("a/one.go", "package a\n")?;
  ws.write_file("b/two.go", "package b\n")?;
  ws.commit("Add files")?;

  let files = SystemGit::default().changed_files(&ws.path, "HEAD~")?;

  assert_eq!(files, vec![PathBuf::from("a/one.go"), PathBuf::from("b/two.go")]);
  Ok(())
}

#[cfg(unix)]
#[test]
fn test_changed_files_with_unusual_names_are_verbatim() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("svc/tab\there.go", "package svc\n")?;
  ws.write_file("svc/\"quoted\".go", "package svc\n")?;
  ws.write_file("svc/caf\u{e9}.go", "package svc\n")?;
  ws.commit("Add oddly named files")?;

  let files = SystemGit::default().changed_files(&ws.path, "HEAD~")?;

  assert_eq!(
    files,
    vec![
      PathBuf::from("svc/\"quoted\".go"),
      PathBuf::from("svc/caf\u{e9}.go"),
      PathBuf::from("svc/tab\there.go"),
    ]
  );
  Ok(())
}

#[test]
fn test_read_file_at_revision() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_module("svc", "example.com/svc", &[])?;
  ws.commit("Add svc")?;
  ws.write_file("svc/go.mod", "module example.com/svc\n\ngo 1.23\n")?;

  let git = SystemGit::default();
  let at_head = git.read_file_at_revision(&ws.path, "HEAD", Path::new("svc/go.mod"))?;
  assert_eq!(
    at_head.as_deref(),
    Some(b"module example.com/svc\n\ngo 1.22\n".as_slice())
  );

  let before = git.read_file_at_revision(&ws.path, "HEAD~", Path::new("svc/go.mod"))?;
  assert_eq!(before, None);
  Ok(())
}

#[test]
fn test_read_file_at_unknown_revision_fails() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let result = SystemGit::default().read_file_at_revision(&ws.path, "no-such-branch", Path::new("README.md"));

  assert!(result.is_err());
  Ok(())
}
