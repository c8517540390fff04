//! Global context for keel operations.
//!
//! Resolves the project root and configuration locations, and builds the
//! command runner every operation uses.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{self, Config};
use crate::util::process::SystemRunner;

/// File marking the root of a Go module.
pub const MODULE_FILE_NAME: &str = "go.mod";

/// Global context containing configuration paths and run options.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Directory keel was started in (or `-C`)
    cwd: PathBuf,

    /// Home directory for global keel data (~/.keel/)
    home: Option<PathBuf>,

    verbose: bool,

    /// Log side-effecting commands instead of running them
    dry_run: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            home: config::global_config_dir(),
            verbose: false,
            dry_run: false,
        }
    }

    /// Override the global keel directory.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Get the global configuration file path (~/.keel/config.toml).
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|home| home.join("config.toml"))
    }

    /// Find the project root: the nearest directory at or above cwd holding
    /// `go.mod` or `keel.toml`. Falls back to cwd.
    pub fn project_root(&self) -> PathBuf {
        self.cwd
            .ancestors()
            .find(|dir| {
                dir.join(MODULE_FILE_NAME).is_file() || dir.join(config::CONFIG_FILE_NAME).is_file()
            })
            .unwrap_or(self.cwd.as_path())
            .to_path_buf()
    }

    /// Load global and project configuration, then environment overrides.
    pub fn load_config<F>(&self, env: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_path = config::project_config_path(&self.project_root());
        let mut config = config::load_config(self.global_config_path().as_deref(), &project_path)?;
        config.apply_env(env);
        Ok(config)
    }

    /// The runner for this invocation, working in the project root.
    pub fn runner(&self) -> SystemRunner {
        SystemRunner::new()
            .working_dir(self.project_root())
            .dry_run(self.dry_run)
    }
}
