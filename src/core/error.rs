//! Error types for go-affected with contextual messages and exit codes
//!
//! Every failure is fatal to the current detection run. The error kinds mirror
//! the collaborators the detector talks to: git, configuration, go.mod parsing
//! and package enumeration.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for go-affected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, malformed manifests)
  User = 1,
  /// System error (git, go toolchain, I/O)
  System = 2,
  /// Interrupted by Ctrl-C or a timeout
  Cancelled = 130,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for go-affected
#[derive(Debug)]
pub enum AffectedError {
  /// Git operation errors
  Vcs(VcsError),

  /// Configuration errors
  Config(ConfigError),

  /// Malformed go.mod / go.work content
  Manifest(ManifestError),

  /// Package enumeration errors
  Loader(LoaderError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl AffectedError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    AffectedError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    AffectedError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Only free-form messages and I/O errors absorb context; typed errors
  /// already carry the path or command that failed.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      AffectedError::Message { message, context, help } => AffectedError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      AffectedError::Io(e) => AffectedError::Message {
        message: format!("{}: {}", ctx_str, e),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      AffectedError::Vcs(VcsError::Cancelled { .. }) | AffectedError::Vcs(VcsError::TimedOut { .. }) => {
        ExitCode::Cancelled
      }
      AffectedError::Loader(LoaderError::Cancelled { .. }) | AffectedError::Loader(LoaderError::TimedOut { .. }) => {
        ExitCode::Cancelled
      }
      AffectedError::Vcs(_) => ExitCode::System,
      AffectedError::Loader(_) => ExitCode::System,
      AffectedError::Io(_) => ExitCode::System,
      AffectedError::Config(_) => ExitCode::User,
      AffectedError::Manifest(_) => ExitCode::User,
      AffectedError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      AffectedError::Vcs(e) => e.help_message(),
      AffectedError::Config(e) => e.help_message(),
      AffectedError::Loader(e) => e.help_message(),
      AffectedError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for AffectedError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AffectedError::Vcs(e) => write!(f, "{}", e),
      AffectedError::Config(e) => write!(f, "{}", e),
      AffectedError::Manifest(e) => write!(f, "{}", e),
      AffectedError::Loader(e) => write!(f, "{}", e),
      AffectedError::Io(e) => write!(f, "I/O error: {}", e),
      AffectedError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for AffectedError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      AffectedError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for AffectedError {
  fn from(err: io::Error) -> Self {
    AffectedError::Io(err)
  }
}

impl From<String> for AffectedError {
  fn from(msg: String) -> Self {
    AffectedError::message(msg)
  }
}

impl From<&str> for AffectedError {
  fn from(msg: &str) -> Self {
    AffectedError::message(msg)
  }
}

impl From<VcsError> for AffectedError {
  fn from(err: VcsError) -> Self {
    AffectedError::Vcs(err)
  }
}

impl From<ConfigError> for AffectedError {
  fn from(err: ConfigError) -> Self {
    AffectedError::Config(err)
  }
}

impl From<ManifestError> for AffectedError {
  fn from(err: ManifestError) -> Self {
    AffectedError::Manifest(err)
  }
}

impl From<LoaderError> for AffectedError {
  fn from(err: LoaderError) -> Self {
    AffectedError::Loader(err)
  }
}

impl From<serde_json::Error> for AffectedError {
  fn from(err: serde_json::Error) -> Self {
    AffectedError::message(format!("JSON error: {}", err))
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum VcsError {
  /// Not inside a git repository
  RepoNotFound { path: PathBuf },

  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Cancelled before the command finished
  Cancelled { command: String },

  /// Command exceeded its deadline
  TimedOut { command: String, seconds: u64 },
}

impl VcsError {
  fn help_message(&self) -> Option<String> {
    match self {
      VcsError::RepoNotFound { path } => Some(format!(
        "Run go-affected from inside a git checkout or pass --repo-root (tried {})",
        path.display()
      )),
      VcsError::CommandFailed { stderr, .. } if stderr.contains("unknown revision") => Some(
        "The base revision does not exist locally. Fetch more history (e.g. `git fetch --depth=2`) or pass --base."
          .to_string(),
      ),
      VcsError::TimedOut { .. } => Some("Raise `timeout_secs` in go-affected.toml or pass --timeout 0.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for VcsError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VcsError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      VcsError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      VcsError::Cancelled { command } => {
        write!(f, "Cancelled while running: {}", command)
      }
      VcsError::TimedOut { command, seconds } => {
        write!(f, "Timed out after {}s while running: {}", seconds, command)
      }
    }
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// A module root or go.mod outside the repository being diffed
  OutsideRepository { path: PathBuf, root: PathBuf },

  /// A config value that failed validation
  InvalidValue { field: String, reason: String },

  /// No module roots could be resolved
  NoModules { root: PathBuf },

  /// go-affected.toml could not be parsed
  ParseFailed { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::OutsideRepository { .. } => {
        Some("Module roots and their go.mod files must live inside the repository being diffed.".to_string())
      }
      ConfigError::NoModules { .. } => {
        Some("Add a go.work file, list `modules` in go-affected.toml, or pass --module.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::OutsideRepository { path, root } => write!(
        f,
        "{} is not inside the git repository {}",
        path.display(),
        root.display()
      ),
      ConfigError::InvalidValue { field, reason } => {
        write!(f, "Invalid configuration value for '{}': {}", field, reason)
      }
      ConfigError::NoModules { root } => {
        write!(f, "No Go modules found under {}", root.display())
      }
      ConfigError::ParseFailed { path, reason } => {
        write!(f, "Failed to parse config {}: {}", path.display(), reason)
      }
    }
  }
}

/// Malformed manifest content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
  Parse { path: PathBuf, line: usize, reason: String },
}

impl fmt::Display for ManifestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ManifestError::Parse { path, line, reason } => {
        write!(f, "failed to parse {}:{}: {}", path.display(), line, reason)
      }
    }
  }
}

/// Package enumeration errors
#[derive(Debug)]
pub enum LoaderError {
  /// `go list` exited unsuccessfully
  CommandFailed { dir: PathBuf, stderr: String },

  /// `go list` output could not be decoded
  Decode { dir: PathBuf, reason: String },

  /// Cancelled before `go list` finished
  Cancelled { dir: PathBuf },

  /// `go list` exceeded its deadline
  TimedOut { dir: PathBuf, seconds: u64 },
}

impl LoaderError {
  fn help_message(&self) -> Option<String> {
    match self {
      LoaderError::CommandFailed { stderr, .. } if stderr.contains("executable file not found") => {
        Some("Install the Go toolchain and make sure `go` is on PATH.".to_string())
      }
      LoaderError::TimedOut { .. } => {
        Some("Raise --timeout (or timeout_secs in go-affected.toml); 0 disables the limit.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for LoaderError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LoaderError::CommandFailed { dir, stderr } => {
        write!(f, "go list failed in {}\n{}", dir.display(), stderr.trim_end())
      }
      LoaderError::Decode { dir, reason } => {
        write!(f, "failed to decode go list output for {}: {}", dir.display(), reason)
      }
      LoaderError::Cancelled { dir } => {
        write!(f, "Cancelled while listing packages in {}", dir.display())
      }
      LoaderError::TimedOut { dir, seconds } => {
        write!(f, "Timed out after {}s while listing packages in {}", seconds, dir.display())
      }
    }
  }
}

/// Result type alias for go-affected
pub type AffectedResult<T> = Result<T, AffectedError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> AffectedResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> AffectedResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<AffectedError>,
{
  fn context(self, ctx: impl Into<String>) -> AffectedResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> AffectedResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &AffectedError) {
  eprintln!("\nerror: {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("help: {}\n", help);
  }
}
