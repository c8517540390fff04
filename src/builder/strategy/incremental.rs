use std::time::Duration;

use crate::builder::batch::split_into_batches;
use crate::builder::discovery::discover_packages;
use crate::builder::executor::BatchExecutor;
use crate::core::errors::BuildError;
use crate::util::process::CommandRunner;

use super::workspace::build_workspace_modules;
use super::{BuildStrategy, StrategyOptions};

/// Discovered packages built in fixed-size batches.
///
/// Runs with `-p 1` unless parallelism is requested, so peak memory stays
/// bounded by the largest batch. Workspaces are built module by module.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalStrategy;

impl BuildStrategy for IncrementalStrategy {
    fn name(&self) -> &'static str {
        "incremental"
    }

    fn execute(&self, runner: &dyn CommandRunner, opts: &StrategyOptions) -> Result<(), BuildError> {
        let mut build_opts = opts.package_options();
        build_opts.parallelism = Some(opts.parallelism.unwrap_or(1));

        if let Some(ref workspace) = opts.workspace {
            tracing::info!("Workspace mode detected, building each module separately");
            return build_workspace_modules(runner, workspace, opts, &build_opts);
        }

        let exclude = opts.exclude_filter();
        let packages = discover_packages(runner, &opts.pattern, exclude.as_ref())?;
        if packages.is_empty() {
            tracing::info!("No packages to build");
            return Ok(());
        }

        let batches = split_into_batches(&packages, opts.batch_size);
        tracing::info!(
            "Building {} packages in {} batches (batch size: {})",
            packages.len(),
            batches.len(),
            batches[0].len()
        );

        BatchExecutor::new(runner, build_opts)
            .delay(Duration::from_millis(opts.batch_delay_ms))
            .progress(!opts.verbose)
            .execute(&batches)?;
        Ok(())
    }
}
