//! Affected package analysis over the Go import graph
//!
//! Built on petgraph for the reverse-import walk; module ownership is a plain
//! longest-prefix lookup.

pub mod affected;
pub mod import_graph;
pub mod ownership;

pub use affected::{
  ChangeDetector, ChangedDependencyCache, ChangedPackage, DetectorOptions, Propagation, detect_changed_packages,
};
pub use import_graph::ImportGraph;
