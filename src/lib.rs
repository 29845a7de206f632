//! go-affected: find the Go packages affected by changes since a git revision
//!
//! A package is affected when one of its files changed, when it imports an
//! affected package, or when it imports a third-party module whose resolved
//! go.mod version changed.

pub mod commands;
pub mod core;
pub mod golang;
pub mod graph;
pub mod utils;

pub use crate::core::error::{AffectedError, AffectedResult};
pub use crate::graph::{ChangeDetector, ChangedPackage, DetectorOptions, Propagation, detect_changed_packages};
