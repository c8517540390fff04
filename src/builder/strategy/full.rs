use crate::builder::discovery::discover_project_packages;
use crate::builder::executor::package_build_command;
use crate::core::errors::BuildError;
use crate::core::package::Package;
use crate::util::process::CommandRunner;

use super::{BuildStrategy, StrategyOptions};

/// One compiler invocation over the whole pattern.
///
/// With an exclusion filter the pattern (or every workspace module) is
/// expanded first and the surviving packages are passed explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullStrategy;

impl BuildStrategy for FullStrategy {
    fn name(&self) -> &'static str {
        "full"
    }

    fn execute(&self, runner: &dyn CommandRunner, opts: &StrategyOptions) -> Result<(), BuildError> {
        let build_opts = opts.package_options();

        let cmd = match opts.exclude_filter() {
            Some(filter) => {
                let packages = discover_project_packages(
                    runner,
                    opts.workspace.as_ref(),
                    &opts.pattern,
                    Some(&filter),
                )?;
                if packages.is_empty() {
                    tracing::info!("No packages to build after excluding `{}`", filter.as_str());
                    return Ok(());
                }
                tracing::info!(
                    "Building {} packages (excluded: {})",
                    packages.len(),
                    filter.as_str()
                );
                package_build_command(packages.iter().map(Package::import_path), &build_opts)
            }
            None => package_build_command([opts.pattern.as_str()], &build_opts),
        };

        tracing::debug!("running {}", cmd.display_command());
        runner
            .run_cmd(&cmd)
            .map_err(|e| BuildError::build_failed(&opts.pattern, e))
    }
}
