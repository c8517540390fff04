//! Settings for `keel prebuild`.
//!
//! Each setting comes from a `key=value` argument, then an environment
//! variable, then `[build.prebuild]` in the config, then a default.

use crate::builder::batch::DEFAULT_BATCH_SIZE;
use crate::builder::discovery::ALL_PACKAGES;
use crate::builder::strategy::{StrategyKind, StrategyOptions};
use crate::util::config::{is_truthy, Config};
use crate::util::memory::{format_memory, parse_memory_limit, MemoryProbe};
use crate::util::params::Params;

/// Argument keys understood by `prebuild`.
pub const KNOWN_KEYS: &[&str] = &[
    "strategy",
    "batch",
    "delay",
    "exclude",
    "verbose",
    "mains-only",
    "mains_only",
    "memory_limit",
    "parallel",
    "p",
    "race",
];

pub const ENV_STRATEGY: &str = "KEEL_BUILD_STRATEGY";
pub const ENV_BATCH_SIZE: &str = "KEEL_BUILD_BATCH_SIZE";
pub const ENV_BATCH_DELAY_MS: &str = "KEEL_BUILD_BATCH_DELAY_MS";
pub const ENV_MEMORY_LIMIT: &str = "KEEL_BUILD_MEMORY_LIMIT";
pub const ENV_EXCLUDE: &str = "KEEL_BUILD_EXCLUDE_PATTERN";
pub const ENV_VERBOSE: &str = "KEEL_BUILD_VERBOSE";

/// Fully resolved pre-build settings.
#[derive(Debug, Clone)]
pub struct PreBuildSettings {
    pub strategy: StrategyKind,
    pub options: StrategyOptions,
    /// Available-memory floor, e.g. `4G`
    pub memory_limit: Option<String>,
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a number", key, value);
            None
        }
    }
}

/// Resolve settings from arguments, environment and config.
pub fn resolve_settings(
    params: &Params,
    config: &Config,
    env: &dyn Fn(&str) -> Option<String>,
) -> PreBuildSettings {
    let unknown = params.unknown_keys(KNOWN_KEYS);
    if !unknown.is_empty() {
        tracing::warn!("ignoring unknown prebuild argument(s): {}", unknown.join(", "));
    }

    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    let prebuild = &config.build.prebuild;

    let strategy_name = params
        .get("strategy")
        .map(String::from)
        .or_else(|| env(ENV_STRATEGY))
        .or_else(|| prebuild.strategy.clone());
    let strategy = match strategy_name {
        Some(name) => name.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, using {} strategy", e, StrategyKind::default());
            StrategyKind::default()
        }),
        None => StrategyKind::default(),
    };

    let batch_size = parse_number::<usize>(
        "batch",
        params.get("batch").map(String::from).or_else(|| env(ENV_BATCH_SIZE)),
    )
    .or(prebuild.batch_size)
    .filter(|n| *n > 0)
    .unwrap_or(DEFAULT_BATCH_SIZE);

    let batch_delay_ms = parse_number::<u64>(
        "delay",
        params.get("delay").map(String::from).or_else(|| env(ENV_BATCH_DELAY_MS)),
    )
    .or(prebuild.batch_delay)
    .unwrap_or(0);

    let memory_limit = params
        .get("memory_limit")
        .map(String::from)
        .or_else(|| env(ENV_MEMORY_LIMIT))
        .or_else(|| prebuild.memory_limit.clone())
        .filter(|l| !l.eq_ignore_ascii_case("auto"));

    let exclude = params
        .get("exclude")
        .map(String::from)
        .or_else(|| env(ENV_EXCLUDE))
        .or_else(|| prebuild.exclude.clone());

    let verbose = params.is_true("verbose")
        || config.build.verbose
        || prebuild.verbose
        || env(ENV_VERBOSE).is_some_and(|v| is_truthy(&v));

    let parallelism = parse_number::<usize>(
        "parallel",
        params.get_any(&["parallel", "p"]).map(String::from),
    )
    .or(config.build.parallel)
    .filter(|n| *n > 0);

    let mut extra_flags = Vec::new();
    if !config.build.tags.is_empty() {
        extra_flags.push("-tags".to_string());
        extra_flags.push(config.build.tags.join(","));
    }

    PreBuildSettings {
        strategy,
        options: StrategyOptions {
            parallelism,
            verbose,
            pattern: ALL_PACKAGES.to_string(),
            race: params.is_true("race"),
            extra_flags,
            exclude,
            batch_size,
            batch_delay_ms,
            mains_only: params.is_true("mains-only") || params.is_true("mains_only"),
            workspace: None,
            exclude_modules: prebuild.exclude_modules.clone(),
        },
        memory_limit,
    }
}

/// Switch to the incremental strategy when available memory is below `limit`.
///
/// An unparseable limit or a failed memory reading leaves the strategy unchanged.
pub fn apply_memory_limit(
    strategy: StrategyKind,
    limit: Option<&str>,
    probe: &dyn MemoryProbe,
) -> StrategyKind {
    let Some(limit) = limit else {
        return strategy;
    };
    let Some(limit_bytes) = parse_memory_limit(limit) else {
        tracing::warn!("ignoring memory limit {:?}: expected e.g. 4G or 512M", limit);
        return strategy;
    };

    match probe.available_bytes() {
        Ok(available) if available < limit_bytes => {
            tracing::warn!(
                "Available memory ({}) is less than limit ({}), using incremental strategy",
                format_memory(available),
                limit
            );
            StrategyKind::Incremental
        }
        Ok(_) => strategy,
        Err(e) => {
            tracing::debug!("memory limit not applied: {:#}", e);
            strategy
        }
    }
}
