//! Build orchestration.
//!
//! Flag composition, package discovery and batching, and the strategies
//! that turn a project build into compiler invocations.

pub mod batch;
pub mod discovery;
pub mod executor;
pub mod flags;
pub mod strategy;

pub use batch::split_into_batches;
pub use discovery::{detect_main_path, discover_packages, find_main_packages, ExcludeFilter, Workspace};
pub use executor::BatchExecutor;
pub use flags::{compose_flags, CompileFlags};
pub use strategy::{BuildStrategy, StrategyKind, StrategyOptions};
