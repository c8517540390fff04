//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod memory;
pub mod params;
pub mod process;
pub mod security;

pub use config::Config;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use process::{CommandRunner, ProcessBuilder, SystemRunner};
