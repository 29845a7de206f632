//! Cancellation for long-running subprocesses
//!
//! A `CancelToken` is shared between the Ctrl-C handler and every git / go
//! subprocess of a run. A token may also carry a per-command timeout, applied
//! from the moment each subprocess is spawned.

use std::time::Duration;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Shared cancellation token plus an optional per-command timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
  cancelled: CancellationToken,
  timeout: Option<Duration>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Token whose subprocesses are killed after `timeout`.
  ///
  /// A zero duration disables the timeout.
  pub fn with_timeout(timeout: Duration) -> Self {
    Self::new().rescoped(timeout)
  }

  /// A token sharing this one's cancellation flag but with a different timeout.
  pub fn rescoped(&self, timeout: Duration) -> Self {
    Self {
      cancelled: self.cancelled.clone(),
      timeout: if timeout.is_zero() { None } else { Some(timeout) },
    }
  }

  /// Request cancellation. Visible to every clone of this token.
  pub fn cancel(&self) {
    self.cancelled.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.is_cancelled()
  }

  /// Resolves once `cancel` has been called on any clone.
  pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
    self.cancelled.cancelled()
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout
  }
}
