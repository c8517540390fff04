//! Build strategies: how a project-wide build turns into compiler invocations.
//!
//! - [`FullStrategy`] builds everything in one invocation.
//! - [`IncrementalStrategy`] builds fixed-size batches one after another.
//! - [`MainsFirstStrategy`] builds entry points individually, then the rest.
//! - [`SmartStrategy`] picks Full or Incremental from available memory.
//!
//! In a `go.work` workspace, Incremental and Smart build module by module.

mod full;
mod incremental;
mod mains_first;
mod smart;
mod workspace;

use std::fmt;
use std::str::FromStr;

pub use full::FullStrategy;
pub use incremental::IncrementalStrategy;
pub use mains_first::MainsFirstStrategy;
pub use smart::SmartStrategy;

use crate::builder::batch::DEFAULT_BATCH_SIZE;
use crate::builder::discovery::{ExcludeFilter, Workspace, ALL_PACKAGES};
use crate::builder::executor::PackageBuildOptions;
use crate::core::errors::BuildError;
use crate::util::config::SmartConfig;
use crate::util::memory::MemoryProbe;
use crate::util::process::CommandRunner;

/// Options shared by every strategy.
#[derive(Debug, Clone)]
pub struct StrategyOptions {
    /// Package build parallelism (`-p`)
    pub parallelism: Option<usize>,
    pub verbose: bool,
    /// Package pattern to build
    pub pattern: String,
    pub race: bool,
    /// Extra compiler flags
    pub extra_flags: Vec<String>,
    /// Packages to leave out, by glob or substring
    pub exclude: Option<String>,
    pub batch_size: usize,
    /// Delay between batches in milliseconds
    pub batch_delay_ms: u64,
    /// Mains-first: stop after the entry points
    pub mains_only: bool,
    /// Set when the project is a `go.work` workspace
    pub workspace: Option<Workspace>,
    /// Workspace module directory names to skip
    pub exclude_modules: Vec<String>,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        StrategyOptions {
            parallelism: None,
            verbose: false,
            pattern: ALL_PACKAGES.to_string(),
            race: false,
            extra_flags: Vec::new(),
            exclude: None,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: 0,
            mains_only: false,
            workspace: None,
            exclude_modules: Vec::new(),
        }
    }
}

impl StrategyOptions {
    pub(crate) fn exclude_filter(&self) -> Option<ExcludeFilter> {
        self.exclude.as_deref().and_then(ExcludeFilter::new)
    }

    pub(crate) fn package_options(&self) -> PackageBuildOptions {
        PackageBuildOptions {
            parallelism: self.parallelism,
            race: self.race,
            verbose: self.verbose,
            extra_flags: self.extra_flags.clone(),
        }
    }
}

/// An algorithm turning "build this project" into compiler invocations.
pub trait BuildStrategy {
    /// Human-readable strategy name.
    fn name(&self) -> &'static str;

    /// Run the build, stopping at the first failed invocation.
    fn execute(&self, runner: &dyn CommandRunner, opts: &StrategyOptions) -> Result<(), BuildError>;
}

/// Strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Full,
    Incremental,
    MainsFirst,
    Smart,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Full => "full",
            StrategyKind::Incremental => "incremental",
            StrategyKind::MainsFirst => "mains-first",
            StrategyKind::Smart => "smart",
        }
    }

    /// Run this strategy.
    pub fn execute(
        self,
        runner: &dyn CommandRunner,
        probe: &dyn MemoryProbe,
        smart: &SmartConfig,
        opts: &StrategyOptions,
    ) -> Result<(), BuildError> {
        let smart_strategy;
        let strategy: &dyn BuildStrategy = match self {
            StrategyKind::Full => &FullStrategy,
            StrategyKind::Incremental => &IncrementalStrategy,
            StrategyKind::MainsFirst => &MainsFirstStrategy,
            StrategyKind::Smart => {
                smart_strategy = SmartStrategy::new(probe, smart);
                &smart_strategy
            }
        };

        tracing::debug!("running {} strategy over {}", strategy.name(), opts.pattern);
        strategy.execute(runner, opts)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "traditional" | "legacy" => Ok(StrategyKind::Full),
            "incremental" => Ok(StrategyKind::Incremental),
            "mains-first" | "mains_first" | "mainsfirst" => Ok(StrategyKind::MainsFirst),
            "smart" | "auto" => Ok(StrategyKind::Smart),
            other => Err(format!("unknown build strategy: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{go_outputs, CommandPattern, FixedMemory, MockRunner};

    #[test]
    fn test_strategy_kind_parse() {
        let cases = [
            ("full", StrategyKind::Full),
            ("Traditional", StrategyKind::Full),
            ("legacy", StrategyKind::Full),
            ("incremental", StrategyKind::Incremental),
            ("mains-first", StrategyKind::MainsFirst),
            ("mains_first", StrategyKind::MainsFirst),
            ("mainsfirst", StrategyKind::MainsFirst),
            ("smart", StrategyKind::Smart),
            ("AUTO", StrategyKind::Smart),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<StrategyKind>().unwrap(), expected, "{}", input);
        }

        assert!("parallel".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::default(), StrategyKind::Full);
        assert_eq!(StrategyKind::MainsFirst.to_string(), "mains-first");
    }

    #[test]
    fn test_kind_dispatch() {
        let runner = MockRunner::new();
        runner.on(
            CommandPattern::exact("go", &["list", "./..."]),
            go_outputs::list(&["example.com/m/a", "example.com/m/b", "example.com/m/c"]),
        );
        let opts = StrategyOptions {
            batch_size: 1,
            ..Default::default()
        };

        StrategyKind::Incremental
            .execute(&runner, &FixedMemory::unavailable(), &SmartConfig::default(), &opts)
            .unwrap();
        assert_eq!(runner.calls_to("go", "build").len(), 3);

        runner.clear_calls();
        StrategyKind::Full
            .execute(&runner, &FixedMemory::unavailable(), &SmartConfig::default(), &opts)
            .unwrap();
        assert_eq!(runner.command_lines(), vec!["go build ./..."]);
    }
}
