//! Per-build address tables

mod build;
mod loader;

pub use build::*;
pub use loader::*;
