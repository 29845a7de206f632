//! Cancellable subprocess execution
//!
//! git and go run as `tokio::process` children on a current-thread runtime
//! owned by the call. The child is killed as soon as the token is cancelled or
//! its timeout elapses.

use super::cancel::CancelToken;
use std::io;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tokio::runtime::Builder;

/// How a cancellable subprocess ended
#[derive(Debug)]
pub enum RunOutcome {
  /// The child exited on its own (successfully or not)
  Finished(Output),
  /// The token was cancelled; the child was killed
  Cancelled,
  /// The token's timeout elapsed; the child was killed
  TimedOut(Duration),
}

/// Run `cmd` to completion unless `token` is cancelled or times out first.
///
/// Blocking; safe to call from rayon workers since every call builds its own runtime.
pub fn run_cancellable(cmd: Command, token: &CancelToken) -> io::Result<RunOutcome> {
  if token.is_cancelled() {
    return Ok(RunOutcome::Cancelled);
  }

  let runtime = Builder::new_current_thread().enable_all().build()?;
  runtime.block_on(run(cmd, token))
}

async fn run(cmd: Command, token: &CancelToken) -> io::Result<RunOutcome> {
  let mut cmd = tokio::process::Command::from(cmd);
  cmd
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);
  let child = cmd.spawn()?;
  let timeout = token.timeout();

  // Dropping the pending wait drops the child, and kill_on_drop kills it.
  let finished = async move {
    match timeout {
      Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(output) => output.map(RunOutcome::Finished),
        Err(_) => Ok(RunOutcome::TimedOut(limit)),
      },
      None => child.wait_with_output().await.map(RunOutcome::Finished),
    }
  };

  tokio::select! {
    biased;
    _ = token.cancelled() => Ok(RunOutcome::Cancelled),
    outcome = finished => outcome,
  }
}
