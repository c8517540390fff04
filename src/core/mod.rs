//! Core data structures for keel.
//!
//! - Build errors and their diagnostics
//! - Target platforms
//! - Packages as reported by the toolchain
//! - Version metadata embedded into binaries

pub mod errors;
pub mod package;
pub mod platform;
pub mod version;

pub use errors::BuildError;
pub use package::Package;
pub use platform::Platform;
pub use version::VersionInfo;
