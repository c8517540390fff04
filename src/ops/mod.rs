//! High-level operations.
//!
//! This module contains the implementation of keel commands.

pub mod build;
pub mod prebuild;

pub use build::Build;
pub use prebuild::{apply_memory_limit, resolve_settings, PreBuildSettings};
