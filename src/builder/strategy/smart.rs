use crate::core::errors::BuildError;
use crate::util::config::SmartConfig;
use crate::util::memory::{format_memory, MemoryProbe};
use crate::util::process::CommandRunner;

use super::workspace::build_workspace_modules;
use super::{BuildStrategy, FullStrategy, IncrementalStrategy, StrategyOptions};

/// Picks a strategy from a single reading of available memory.
///
/// Below the threshold (or when memory cannot be read) the build goes
/// incremental with small batches; otherwise it is a full build. A
/// workspace is always built module by module.
pub struct SmartStrategy<'a> {
    probe: &'a dyn MemoryProbe,
    threshold_mb: u64,
    low_memory_batch_size: usize,
    low_memory_delay_ms: u64,
}

impl<'a> SmartStrategy<'a> {
    pub fn new(probe: &'a dyn MemoryProbe, config: &SmartConfig) -> Self {
        SmartStrategy {
            probe,
            threshold_mb: config.memory_threshold_mb(),
            low_memory_batch_size: config.low_memory_batch_size(),
            low_memory_delay_ms: config.low_memory_delay_ms(),
        }
    }

    fn low_memory_options(&self, opts: &StrategyOptions) -> StrategyOptions {
        StrategyOptions {
            batch_size: self.low_memory_batch_size,
            batch_delay_ms: self.low_memory_delay_ms,
            ..opts.clone()
        }
    }
}

impl BuildStrategy for SmartStrategy<'_> {
    fn name(&self) -> &'static str {
        "smart"
    }

    fn execute(&self, runner: &dyn CommandRunner, opts: &StrategyOptions) -> Result<(), BuildError> {
        let available = match self.probe.available_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to detect system memory: {:#}", e);
                tracing::info!("Falling back to incremental strategy with small batches");
                return IncrementalStrategy.execute(runner, &self.low_memory_options(opts));
            }
        };

        let available_mb = available / (1024 * 1024);
        tracing::info!("Available memory: {}", format_memory(available));

        if let Some(ref workspace) = opts.workspace {
            tracing::info!("Workspace mode detected, building each module separately");
            return build_workspace_modules(runner, workspace, opts, &opts.package_options());
        }

        if available_mb < self.threshold_mb {
            tracing::info!(
                "Selected strategy: incremental (below {} MB threshold)",
                self.threshold_mb
            );
            IncrementalStrategy.execute(runner, &self.low_memory_options(opts))
        } else {
            tracing::info!("Selected strategy: full (sufficient memory)");
            FullStrategy.execute(runner, opts)
        }
    }
}
