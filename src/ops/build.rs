//! Build entry points: host, cross-platform, install, generate and pre-build.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::builder::discovery::{detect_main_path, Workspace, ALL_PACKAGES};
use crate::builder::flags::{compose_flags, version_info, CompileFlags};
use crate::core::errors::BuildError;
use crate::core::platform::{
    Platform, DARWIN_PLATFORMS, DEFAULT_PLATFORMS, LINUX_PLATFORMS, WINDOWS_PLATFORMS,
};
use crate::core::version::{VersionInfo, VERSION_DEV};
use crate::ops::prebuild::{apply_memory_limit, resolve_settings};
use crate::util::config::Config;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::memory::{MemoryProbe, SystemMemoryProbe};
use crate::util::params::Params;
use crate::util::process::{CommandRunner, ProcessBuilder, SystemRunner};
use crate::util::security;

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Build operations for one Go project.
///
/// Owns the command runner; every external process goes through it.
pub struct Build<R: CommandRunner = SystemRunner> {
    root: PathBuf,
    config: Config,
    runner: R,
    probe: Option<Box<dyn MemoryProbe>>,
    env: EnvLookup,
}

impl<R: CommandRunner> Build<R> {
    /// Create build operations for the project at `root`.
    pub fn new(root: impl Into<PathBuf>, config: Config, runner: R) -> Self {
        Build {
            root: root.into(),
            config,
            runner,
            probe: None,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Use a fixed memory probe instead of querying the system.
    pub fn with_memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Read environment variables through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.env = Box::new(lookup);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn binary_name(&self) -> String {
        self.config.binary_name(&self.root)
    }

    /// Output path relative to the project root, e.g. `bin/app-linux-amd64`.
    fn output_path(&self, file_name: &str) -> String {
        let dir = self.config.output_dir().trim_end_matches('/');
        format!("{}/{}", dir, file_name)
    }

    fn version_info(&self, forced_version: Option<&str>) -> VersionInfo {
        version_info(&self.runner, &self.config, forced_version)
    }

    fn compile_flags(&self, info: &VersionInfo) -> CompileFlags {
        if !self.config.cache_enabled() {
            tracing::debug!("build result caching disabled");
        }
        let flags = compose_flags(&self.config, info);
        tracing::debug!("compiler flags: {}", flags);
        flags
    }

    /// Build the binary for the host platform into `<output>/<binary>`.
    pub fn default_build(&self) -> Result<(), BuildError> {
        let main = detect_main_path(&self.root, &self.config, true)?;
        let info = self.version_info(None);
        let flags = self.compile_flags(&info);

        let host = Platform::host();
        let output = self.output_path(&host.host_output_name(&self.binary_name()));
        tracing::info!("Building {} ({}) for {}", self.binary_name(), info, host);

        let start = Instant::now();
        let cmd = ProcessBuilder::new("go")
            .arg("build")
            .args(&flags)
            .args(["-o", output.as_str(), main.as_str()]);
        self.runner
            .run_cmd(&cmd)
            .map_err(|e| BuildError::build_failed(output.as_str(), e))?;

        eprintln!(
            "    Finished {} in {:.2}s",
            output,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Cross-compile for one `os/arch` platform.
    pub fn platform(&self, platform: &str) -> Result<(), BuildError> {
        let platform = Platform::parse(platform)?;
        self.build_platforms(std::slice::from_ref(&platform))
    }

    /// Build every configured platform, or the default set when none are configured.
    ///
    /// All platforms are validated before the first build starts.
    pub fn all(&self) -> Result<(), BuildError> {
        let platforms = if self.config.build.platforms.is_empty() {
            parse_platforms(DEFAULT_PLATFORMS.iter().copied())?
        } else {
            parse_platforms(self.config.build.platforms.iter().map(String::as_str))?
        };
        self.build_platforms(&platforms)
    }

    pub fn linux(&self) -> Result<(), BuildError> {
        self.build_platforms(&parse_platforms(LINUX_PLATFORMS.iter().copied())?)
    }

    pub fn darwin(&self) -> Result<(), BuildError> {
        self.build_platforms(&parse_platforms(DARWIN_PLATFORMS.iter().copied())?)
    }

    pub fn windows(&self) -> Result<(), BuildError> {
        self.build_platforms(&parse_platforms(WINDOWS_PLATFORMS.iter().copied())?)
    }

    /// Build `platforms` in order, stopping at the first failure.
    fn build_platforms(&self, platforms: &[Platform]) -> Result<(), BuildError> {
        let main = detect_main_path(&self.root, &self.config, true)?;
        let info = self.version_info(None);
        let flags = self.compile_flags(&info);
        let binary = self.binary_name();

        let start = Instant::now();
        for platform in platforms {
            let output = self.output_path(&platform.output_name(&binary));
            tracing::info!("Building {} for {}", binary, platform);

            let cmd = ProcessBuilder::new("go")
                .arg("build")
                .args(&flags)
                .args(["-o", output.as_str(), main.as_str()])
                .env("GOOS", platform.os())
                .env("GOARCH", platform.arch());
            self.runner
                .run_cmd(&cmd)
                .map_err(|e| BuildError::build_failed(platform.to_string(), e))?;
        }

        eprintln!(
            "    Finished {} platform(s) in {:.2}s",
            platforms.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Remove the output directory and clear the test cache.
    ///
    /// The toolchain build cache is cleared too when `clean_cache` is set.
    pub fn clean(&self) -> Result<(), BuildError> {
        let output_dir = self.clean_target()?;
        if self.runner.is_dry_run() {
            tracing::info!("[dry run] remove {}", output_dir.display());
        } else {
            remove_dir_all_if_exists(&output_dir)?;
            eprintln!("     Removed {}", output_dir.display());
        }

        let testcache = ProcessBuilder::new("go").args(["clean", "-testcache"]);
        self.runner
            .run_cmd(&testcache)
            .map_err(|e| BuildError::step_failed("clean", e))?;

        if self.config.build.clean_cache {
            let cache = ProcessBuilder::new("go").args(["clean", "-cache"]);
            self.runner
                .run_cmd(&cache)
                .map_err(|e| BuildError::step_failed("clean", e))?;
        }
        Ok(())
    }

    /// The output directory, refused when it escapes or is the project root.
    fn clean_target(&self) -> Result<PathBuf, BuildError> {
        let configured = self.config.output_dir();
        security::validate_path(configured)?;

        let path = Path::new(configured);
        if path.is_absolute() && !path.starts_with(&self.root) {
            return Err(BuildError::unsafe_input(
                configured,
                "output directory is outside the project root",
            ));
        }

        let target = self.root.join(path);
        if target == self.root {
            return Err(BuildError::unsafe_input(
                configured,
                "output directory is the project root",
            ));
        }
        Ok(target)
    }

    /// Install the binary with the toolchain's `install` command.
    pub fn install(&self) -> Result<(), BuildError> {
        self.install_with(None)
    }

    /// Install with the version forced to `dev`.
    pub fn dev(&self) -> Result<(), BuildError> {
        self.install_with(Some(VERSION_DEV))
    }

    fn install_with(&self, forced_version: Option<&str>) -> Result<(), BuildError> {
        let package = detect_main_path(&self.root, &self.config, false)?;
        let info = self.version_info(forced_version);
        if forced_version.is_none() && info.is_dev() {
            tracing::warn!("no version tag found, installing as `{}`", VERSION_DEV);
        }
        let flags = self.compile_flags(&info);

        let cmd = ProcessBuilder::new("go")
            .arg("install")
            .args(&flags)
            .arg(&package);
        self.runner
            .run_cmd(&cmd)
            .map_err(|e| BuildError::step_failed("install", e))?;

        match self.install_dir() {
            Some(dir) => eprintln!(
                "   Installed {} ({}) to {}",
                self.binary_name(),
                info,
                dir.display()
            ),
            None => eprintln!("   Installed {} ({})", self.binary_name(), info),
        }
        Ok(())
    }

    /// Where `go install` puts binaries: `GOBIN`, else `GOPATH/bin`, else `~/go/bin`.
    pub fn install_dir(&self) -> Option<PathBuf> {
        let env = |key: &str| (self.env)(key).filter(|v| !v.trim().is_empty());

        if let Some(gobin) = env("GOBIN") {
            return Some(PathBuf::from(gobin));
        }
        if let Some(gopath) = env("GOPATH") {
            if let Some(first) = std::env::split_paths(&gopath).next() {
                return Some(first.join("bin"));
            }
        }
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join("go").join("bin"))
    }

    /// Run code generators across the module.
    pub fn generate(&self) -> Result<(), BuildError> {
        let mut cmd = ProcessBuilder::new("go").arg("generate");
        if self.config.build.verbose {
            cmd = cmd.arg("-v");
        }
        if !self.config.build.tags.is_empty() {
            cmd = cmd.args(["-tags".to_string(), self.config.build.tags.join(",")]);
        }
        cmd = cmd.arg(ALL_PACKAGES);

        tracing::info!("Running code generators");
        self.runner
            .run_cmd(&cmd)
            .map_err(|e| BuildError::step_failed("generate", e))
    }

    /// Tidy module requirements, then build every package.
    pub fn pre_build(&self) -> Result<(), BuildError> {
        self.pre_build_with_args::<&str>(&[])
    }

    /// Pre-build with `key=value` arguments such as `strategy=incremental batch=5`.
    pub fn pre_build_with_args<S: AsRef<str>>(&self, args: &[S]) -> Result<(), BuildError> {
        let params = Params::parse(args);
        let mut settings = resolve_settings(&params, &self.config, &*self.env);

        let tidy = ProcessBuilder::new("go").args(["mod", "tidy"]);
        self.runner
            .run_cmd(&tidy)
            .map_err(|e| BuildError::step_failed("go mod tidy", e))?;

        settings.options.workspace = Workspace::detect(&self.runner, &self.root);

        let system_probe;
        let probe: &dyn MemoryProbe = match self.probe {
            Some(ref probe) => probe.as_ref(),
            None => {
                system_probe = SystemMemoryProbe::new(&self.runner);
                &system_probe
            }
        };

        let strategy = apply_memory_limit(settings.strategy, settings.memory_limit.as_deref(), probe);
        tracing::info!("Pre-building with {} strategy", strategy);

        strategy.execute(&self.runner, probe, &self.config.build.smart, &settings.options)
    }
}

fn parse_platforms<'a, I>(platforms: I) -> Result<Vec<Platform>, BuildError>
where
    I: IntoIterator<Item = &'a str>,
{
    platforms.into_iter().map(Platform::parse).collect()
}
