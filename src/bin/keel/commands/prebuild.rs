//! `keel prebuild` command
//!
//! Arguments are `key=value` pairs; see `keel prebuild --help`.

use anyhow::Result;

use super::open_project;
use crate::cli::PrebuildArgs;
use keel::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: PrebuildArgs) -> Result<()> {
    let build = open_project(ctx)?;
    build.pre_build_with_args(&args.params)?;
    Ok(())
}
