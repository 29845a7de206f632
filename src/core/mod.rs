//! Core building blocks shared by every command
//!
//! - **cancel**: Ctrl-C and timeout propagation to subprocesses
//! - **config**: go-affected.toml parsing, validation and module root resolution
//! - **context**: Repository context built once per invocation
//! - **error**: Error types with contextual help messages
//! - **process**: Cancellable subprocess execution
//! - **vcs**: Git operations abstraction (SystemGit)

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod process;
pub mod vcs;
