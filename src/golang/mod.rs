//! Go toolchain inputs: go.mod / go.work manifests and package listings

pub mod manifest;
pub mod packages;
pub mod workspace;

pub use packages::{GoListLoader, ModuleDescriptor, Package, PackageLoader};
