//! Configuration file support for keel.
//!
//! keel reads two configuration files:
//! - Global: `~/.keel/config.toml` - User-wide defaults
//! - Project: `keel.toml` at the project root - Project-specific overrides
//!
//! Project config takes precedence over global config, and environment
//! variables take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Project configuration file name.
pub const CONFIG_FILE_NAME: &str = "keel.toml";

/// Output directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "bin";

/// Linker symbol receiving the version string.
pub const DEFAULT_VERSION_VAR: &str = "main.version";

/// Linker symbol receiving the commit hash.
pub const DEFAULT_COMMIT_VAR: &str = "main.commit";

/// Smart strategy: below this much available memory, builds go incremental.
pub const DEFAULT_MEMORY_THRESHOLD_MB: u64 = 4000;

/// Smart strategy: batch size used on low-memory machines.
pub const DEFAULT_LOW_MEMORY_BATCH_SIZE: usize = 5;

/// Smart strategy: delay between batches on low-memory machines.
pub const DEFAULT_LOW_MEMORY_DELAY_MS: u64 = 500;

/// keel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project identity
    pub project: ProjectConfig,

    /// Build settings
    pub build: BuildConfig,
}

/// Project identity settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Binary name (defaults to the project directory name)
    pub binary: Option<String>,

    /// Module path, informational
    pub module: Option<String>,

    /// Version used when version control has no tag
    pub version: Option<String>,

    /// Path of the main package, relative to the project root
    pub main: Option<String>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build tags, joined with `,`
    pub tags: Vec<String>,

    /// Extra linker flags; `{{.Version}}` and `{{.Commit}}` are expanded
    pub ldflags: Vec<String>,

    /// Extra toolchain flags appended after the standard ones
    pub goflags: Vec<String>,

    pub trimpath: bool,

    pub verbose: bool,

    /// Platforms built by `all`
    pub platforms: Vec<String>,

    /// Output directory for binaries
    pub output: Option<String>,

    /// Default package build parallelism (`-p`)
    pub parallel: Option<usize>,

    pub version_var: Option<String>,

    pub commit_var: Option<String>,

    /// Build result caching; turned off for test isolation
    pub cache: Option<bool>,

    /// Keep symbol tables and debug info
    pub debug: bool,

    /// Also clear the toolchain build cache on `clean`
    pub clean_cache: bool,

    /// Pre-build defaults
    pub prebuild: PreBuildConfig,

    /// Smart strategy thresholds
    pub smart: SmartConfig,
}

/// Defaults for `prebuild` arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreBuildConfig {
    pub strategy: Option<String>,

    pub batch_size: Option<usize>,

    /// Delay between batches in milliseconds
    pub batch_delay: Option<u64>,

    /// Available-memory floor such as `4G` or `512M`
    pub memory_limit: Option<String>,

    /// Glob or substring of packages to skip
    pub exclude: Option<String>,

    /// Workspace module directory names to skip
    pub exclude_modules: Vec<String>,

    pub verbose: bool,
}

/// Thresholds for the memory-adaptive strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartConfig {
    pub memory_threshold_mb: Option<u64>,
    pub low_memory_batch_size: Option<usize>,
    pub low_memory_delay_ms: Option<u64>,
}

impl SmartConfig {
    pub fn memory_threshold_mb(&self) -> u64 {
        self.memory_threshold_mb
            .unwrap_or(DEFAULT_MEMORY_THRESHOLD_MB)
    }

    pub fn low_memory_batch_size(&self) -> usize {
        self.low_memory_batch_size
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LOW_MEMORY_BATCH_SIZE)
    }

    pub fn low_memory_delay_ms(&self) -> u64 {
        self.low_memory_delay_ms
            .unwrap_or(DEFAULT_LOW_MEMORY_DELAY_MS)
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let Config { project, build } = other;

        // Project settings
        if project.binary.is_some() {
            self.project.binary = project.binary;
        }
        if project.module.is_some() {
            self.project.module = project.module;
        }
        if project.version.is_some() {
            self.project.version = project.version;
        }
        if project.main.is_some() {
            self.project.main = project.main;
        }

        // Build settings
        if !build.tags.is_empty() {
            self.build.tags = build.tags;
        }
        if !build.ldflags.is_empty() {
            self.build.ldflags = build.ldflags;
        }
        if !build.goflags.is_empty() {
            self.build.goflags = build.goflags;
        }
        if !build.platforms.is_empty() {
            self.build.platforms = build.platforms;
        }
        if build.trimpath {
            self.build.trimpath = true;
        }
        if build.verbose {
            self.build.verbose = true;
        }
        if build.debug {
            self.build.debug = true;
        }
        if build.clean_cache {
            self.build.clean_cache = true;
        }
        if build.output.is_some() {
            self.build.output = build.output;
        }
        if build.parallel.is_some() {
            self.build.parallel = build.parallel;
        }
        if build.version_var.is_some() {
            self.build.version_var = build.version_var;
        }
        if build.commit_var.is_some() {
            self.build.commit_var = build.commit_var;
        }
        if build.cache.is_some() {
            self.build.cache = build.cache;
        }

        // Pre-build settings
        let prebuild = build.prebuild;
        if prebuild.strategy.is_some() {
            self.build.prebuild.strategy = prebuild.strategy;
        }
        if prebuild.batch_size.is_some() {
            self.build.prebuild.batch_size = prebuild.batch_size;
        }
        if prebuild.batch_delay.is_some() {
            self.build.prebuild.batch_delay = prebuild.batch_delay;
        }
        if prebuild.memory_limit.is_some() {
            self.build.prebuild.memory_limit = prebuild.memory_limit;
        }
        if prebuild.exclude.is_some() {
            self.build.prebuild.exclude = prebuild.exclude;
        }
        if !prebuild.exclude_modules.is_empty() {
            self.build.prebuild.exclude_modules = prebuild.exclude_modules;
        }
        if prebuild.verbose {
            self.build.prebuild.verbose = true;
        }

        // Smart thresholds
        let smart = build.smart;
        if smart.memory_threshold_mb.is_some() {
            self.build.smart.memory_threshold_mb = smart.memory_threshold_mb;
        }
        if smart.low_memory_batch_size.is_some() {
            self.build.smart.low_memory_batch_size = smart.low_memory_batch_size;
        }
        if smart.low_memory_delay_ms.is_some() {
            self.build.smart.low_memory_delay_ms = smart.low_memory_delay_ms;
        }
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(binary) = get("KEEL_BINARY") {
            self.project.binary = Some(binary.trim().to_string());
        }
        if let Some(output) = get("KEEL_BUILD_OUTPUT") {
            self.build.output = Some(output.trim().to_string());
        }
        if let Some(tags) = get("KEEL_BUILD_TAGS") {
            self.build.tags = split_list(&tags);
        }
        if let Some(platforms) = get("KEEL_BUILD_PLATFORMS") {
            self.build.platforms = split_list(&platforms);
        }
        if let Some(verbose) = get("KEEL_BUILD_VERBOSE") {
            self.build.verbose = is_truthy(&verbose);
        }
        if let Some(trimpath) = get("KEEL_BUILD_TRIMPATH") {
            self.build.trimpath = is_truthy(&trimpath);
        }
        if let Some(parallel) = get("KEEL_BUILD_PARALLEL") {
            match parallel.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.build.parallel = Some(n),
                _ => tracing::warn!("ignoring KEEL_BUILD_PARALLEL={:?}: not a positive number", parallel),
            }
        }
        if let Some(modules) = get("KEEL_EXCLUDE_MODULES") {
            self.build.prebuild.exclude_modules = split_list(&modules);
        }
        if let Some(disabled) = get("KEEL_CACHE_DISABLED") {
            if is_truthy(&disabled) {
                self.build.cache = Some(false);
            }
        }
        if let Some(debug) = get("DEBUG") {
            self.build.debug = is_truthy(&debug);
        }
        if let Some(clean) = get("CLEAN_CACHE") {
            self.build.clean_cache = is_truthy(&clean);
        }
    }

    /// Binary name: configured, else the project directory name.
    pub fn binary_name(&self, project_root: &Path) -> String {
        if let Some(ref binary) = self.project.binary {
            return binary.clone();
        }
        project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "app".to_string())
    }

    /// Output directory for binaries.
    pub fn output_dir(&self) -> &str {
        self.build
            .output
            .as_deref()
            .filter(|o| !o.is_empty())
            .unwrap_or(DEFAULT_OUTPUT_DIR)
    }

    pub fn version_var(&self) -> &str {
        self.build
            .version_var
            .as_deref()
            .unwrap_or(DEFAULT_VERSION_VAR)
    }

    pub fn commit_var(&self) -> &str {
        self.build
            .commit_var
            .as_deref()
            .unwrap_or(DEFAULT_COMMIT_VAR)
    }

    /// Whether build results may be reused between runs.
    pub fn cache_enabled(&self) -> bool {
        self.build.cache.unwrap_or(true)
    }

    /// Configured project version, if non-empty.
    pub fn project_version(&self) -> Option<&str> {
        self.project
            .version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Interpret an environment-style boolean.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (keel.toml)
/// 2. Global config (~/.keel/config.toml)
/// 3. Defaults
///
/// A broken global config is ignored with a warning; a broken project
/// config is an error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global keel config directory (~/.keel).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".keel"))
}

/// Get the global config path (~/.keel/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (keel.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.output_dir(), "bin");
        assert_eq!(config.version_var(), "main.version");
        assert_eq!(config.commit_var(), "main.commit");
        assert!(config.cache_enabled());
        assert!(config.project_version().is_none());
        assert_eq!(config.build.smart.memory_threshold_mb(), 4000);
        assert_eq!(config.build.smart.low_memory_batch_size(), 5);
        assert_eq!(config.build.smart.low_memory_delay_ms(), 500);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILE_NAME);

        std::fs::write(
            &config_path,
            r#"
[project]
binary = "tool"
version = "v0.9.0"

[build]
tags = ["netgo", "osusergo"]
ldflags = ["-X main.date=today"]
trimpath = true
platforms = ["linux/arm64"]
output = "dist"

[build.prebuild]
strategy = "incremental"
batch_size = 3
exclude_modules = ["magefiles"]

[build.smart]
memory_threshold_mb = 2048
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.project.binary.as_deref(), Some("tool"));
        assert_eq!(config.project_version(), Some("v0.9.0"));
        assert_eq!(config.build.tags, vec!["netgo", "osusergo"]);
        assert!(config.build.trimpath);
        assert_eq!(config.output_dir(), "dist");
        assert_eq!(config.build.prebuild.strategy.as_deref(), Some("incremental"));
        assert_eq!(config.build.prebuild.batch_size, Some(3));
        assert_eq!(config.build.prebuild.exclude_modules, vec!["magefiles"]);
        assert_eq!(config.build.smart.memory_threshold_mb(), 2048);
        assert_eq!(config.build.smart.low_memory_batch_size(), 5);
    }

    #[test]
    fn test_config_load_rejects_bad_toml() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[build\ntags = 3").unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse config file"));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.build.tags = vec!["base".to_string()];
        base.build.parallel = Some(4);
        base.project.binary = Some("base".to_string());

        let mut override_cfg = Config::default();
        override_cfg.build.tags = vec!["override".to_string()];
        override_cfg.build.prebuild.batch_size = Some(7);

        base.merge(override_cfg);

        assert_eq!(base.build.tags, vec!["override"]);
        assert_eq!(base.build.parallel, Some(4)); // Not overridden
        assert_eq!(base.project.binary.as_deref(), Some("base"));
        assert_eq!(base.build.prebuild.batch_size, Some(7));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join(CONFIG_FILE_NAME);

        std::fs::write(&global, "[build]\noutput = \"out\"\nparallel = 2\n").unwrap();
        std::fs::write(&project, "[build]\noutput = \"dist\"\n").unwrap();

        let config = load_config(Some(&global), &project).unwrap();
        assert_eq!(config.output_dir(), "dist");
        assert_eq!(config.build.parallel, Some(2));
    }

    #[test]
    fn test_load_config_missing_files() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, &tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_broken_global_config_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        std::fs::write(&global, "not = [valid").unwrap();

        let config = load_config(Some(&global), &tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default();
        config.build.tags = vec!["file".to_string()];

        config.apply_env(env(&[
            ("KEEL_BINARY", "envbin"),
            ("KEEL_BUILD_TAGS", "a, b,,c"),
            ("KEEL_BUILD_PLATFORMS", "linux/amd64,darwin/arm64"),
            ("KEEL_BUILD_TRIMPATH", "1"),
            ("KEEL_BUILD_PARALLEL", "3"),
            ("KEEL_CACHE_DISABLED", "true"),
            ("KEEL_EXCLUDE_MODULES", "tools, magefiles"),
            ("DEBUG", "yes"),
            ("CLEAN_CACHE", "false"),
        ]));

        assert_eq!(config.project.binary.as_deref(), Some("envbin"));
        assert_eq!(config.build.tags, vec!["a", "b", "c"]);
        assert_eq!(config.build.platforms, vec!["linux/amd64", "darwin/arm64"]);
        assert!(config.build.trimpath);
        assert_eq!(config.build.parallel, Some(3));
        assert!(!config.cache_enabled());
        assert_eq!(config.build.prebuild.exclude_modules, vec!["tools", "magefiles"]);
        assert!(config.build.debug);
        assert!(!config.build.clean_cache);
    }

    #[test]
    fn test_apply_env_ignores_empty_and_invalid() {
        let mut config = Config::default();
        config.build.parallel = Some(8);

        config.apply_env(env(&[("KEEL_BUILD_OUTPUT", ""), ("KEEL_BUILD_PARALLEL", "lots")]));

        assert_eq!(config.output_dir(), "bin");
        assert_eq!(config.build.parallel, Some(8));
    }

    #[test]
    fn test_binary_name_defaults_to_directory() {
        let config = Config::default();
        assert_eq!(config.binary_name(Path::new("/work/module")), "module");

        let mut named = Config::default();
        named.project.binary = Some("tool".to_string());
        assert_eq!(named.binary_name(Path::new("/work/module")), "tool");
    }

    #[test]
    fn test_is_truthy() {
        for v in ["true", "TRUE", "1", "yes", " yes "] {
            assert!(is_truthy(v), "{}", v);
        }
        for v in ["false", "0", "no", "", "on"] {
            assert!(!is_truthy(v), "{}", v);
        }
    }
}
