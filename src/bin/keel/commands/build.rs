//! `keel build` command

use anyhow::Result;

use super::open_project;
use crate::cli::BuildArgs;
use keel::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: BuildArgs) -> Result<()> {
    let build = open_project(ctx)?;

    if !args.has_targets() {
        build.default_build()?;
        return Ok(());
    }

    if args.all {
        build.all()?;
        return Ok(());
    }

    for platform in &args.platform {
        build.platform(platform)?;
    }
    if args.linux {
        build.linux()?;
    }
    if args.darwin {
        build.darwin()?;
    }
    if args.windows {
        build.windows()?;
    }

    Ok(())
}
