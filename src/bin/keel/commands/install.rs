//! `keel install` and `keel dev` commands

use anyhow::Result;

use super::open_project;
use keel::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, dev: bool) -> Result<()> {
    let build = open_project(ctx)?;
    if dev {
        build.dev()?;
    } else {
        build.install()?;
    }
    Ok(())
}
