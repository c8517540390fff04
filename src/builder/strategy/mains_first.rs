use std::collections::HashSet;
use std::time::Duration;

use crate::builder::batch::split_into_batches;
use crate::builder::discovery::{discover_project_packages, find_project_main_packages};
use crate::builder::executor::{package_build_command, BatchExecutor};
use crate::core::errors::BuildError;
use crate::core::package::Package;
use crate::util::process::CommandRunner;

use super::{BuildStrategy, StrategyOptions};

/// Entry points first, one invocation each, then the remaining packages in batches.
///
/// Entry points pull in most of the dependency graph, so the batches that
/// follow mostly hit the build cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainsFirstStrategy;

impl BuildStrategy for MainsFirstStrategy {
    fn name(&self) -> &'static str {
        "mains-first"
    }

    fn execute(&self, runner: &dyn CommandRunner, opts: &StrategyOptions) -> Result<(), BuildError> {
        let exclude = opts.exclude_filter();
        let build_opts = opts.package_options();

        tracing::info!("Phase 1: building main packages");
        let workspace = opts.workspace.as_ref();
        let mains = match find_project_main_packages(runner, workspace, &opts.pattern, exclude.as_ref()) {
            Ok(mains) => mains,
            Err(e) => {
                tracing::warn!("Failed to identify main packages: {}", e);
                Vec::new()
            }
        };

        if mains.is_empty() {
            tracing::info!("No main packages found");
        }
        for main in &mains {
            let cmd = package_build_command([main.import_path()], &build_opts);
            runner
                .run_cmd(&cmd)
                .map_err(|e| BuildError::build_failed(main.import_path(), e))?;
        }

        if opts.mains_only {
            tracing::info!("Built {} main package(s), skipping the rest", mains.len());
            return Ok(());
        }

        tracing::info!("Phase 2: building remaining packages");
        let built: HashSet<&str> = mains.iter().map(Package::import_path).collect();
        let remaining: Vec<Package> = discover_project_packages(runner, workspace, &opts.pattern, exclude.as_ref())?
            .into_iter()
            .filter(|p| !built.contains(p.import_path()))
            .collect();

        if remaining.is_empty() {
            tracing::info!("All packages already built with main packages");
            return Ok(());
        }

        let batches = split_into_batches(&remaining, opts.batch_size);
        tracing::info!(
            "Building {} remaining packages in {} batches",
            remaining.len(),
            batches.len()
        );

        BatchExecutor::new(runner, build_opts)
            .delay(Duration::from_millis(opts.batch_delay_ms))
            .progress(!opts.verbose)
            .execute(&batches)?;
        Ok(())
    }
}
