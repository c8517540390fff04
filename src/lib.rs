//! keel - A build orchestrator for Go projects
//!
//! This crate provides the core library functionality for keel, including
//! version-stamped and cross-platform builds, package discovery, and
//! memory-aware build strategies for large modules.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for keel unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a mock command runner, a fixed memory probe,
/// and Go project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{BuildError, Package, Platform, VersionInfo};
pub use ops::Build;
pub use util::context::GlobalContext;
pub use util::{CommandRunner, Config, ProcessBuilder, SystemRunner};
