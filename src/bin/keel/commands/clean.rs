//! `keel clean` command

use anyhow::Result;

use super::open_project;
use keel::util::GlobalContext;

pub fn execute(ctx: &GlobalContext) -> Result<()> {
    open_project(ctx)?.clean()?;
    Ok(())
}
