//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod generate;
pub mod install;
pub mod platforms;
pub mod prebuild;

use anyhow::Result;

use keel::ops::Build;
use keel::util::GlobalContext;

/// Load configuration and set up build operations for the project.
pub fn open_project(ctx: &GlobalContext) -> Result<Build> {
    let root = ctx.project_root();
    let config = ctx.load_config(|key| std::env::var(key).ok())?;
    tracing::debug!("project root: {}", root.display());
    Ok(Build::new(root, config, ctx.runner()))
}
