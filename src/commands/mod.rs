//! CLI commands for go-affected
//!
//! - **detect**: Find Go packages affected by changes since a base revision
//! - **modules**: List the module roots a detect run would scan
//!
//! All commands accept `&RepoContext` to avoid redundant repository and config loads.

pub mod detect;
pub mod modules;

pub use detect::{DetectArgs, OutputFormat, run_detect};
pub use modules::run_modules;
