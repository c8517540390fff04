//! Version metadata and compiler flag composition.

use std::fmt;

use crate::core::version::{VersionInfo, COMMIT_UNKNOWN, VERSION_DEV};
use crate::util::config::Config;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Ordered compiler flags, built fresh for every build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileFlags(Vec<String>);

impl CompileFlags {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.0
            .iter()
            .position(|f| f == flag)
            .and_then(|i| self.0.get(i + 1))
            .map(String::as_str)
    }
}

impl IntoIterator for CompileFlags {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompileFlags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for CompileFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

fn first_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
}

/// The latest version tag, else the configured version, else `dev`.
pub fn version(runner: &dyn CommandRunner, config: &Config) -> String {
    let describe = ProcessBuilder::new("git").args(["describe", "--tags", "--abbrev=0"]);
    match runner.run_cmd_output(&describe) {
        Ok(out) => {
            if let Some(tag) = first_line(&out) {
                return tag;
            }
        }
        Err(e) => tracing::debug!("no version tag: {}", e),
    }

    config
        .project_version()
        .map(String::from)
        .unwrap_or_else(|| VERSION_DEV.to_string())
}

/// The short hash of `HEAD`, else `unknown`.
pub fn commit(runner: &dyn CommandRunner) -> String {
    let rev_parse = ProcessBuilder::new("git").args(["rev-parse", "--short", "HEAD"]);
    match runner.run_cmd_output(&rev_parse) {
        Ok(out) => first_line(&out).unwrap_or_else(|| COMMIT_UNKNOWN.to_string()),
        Err(e) => {
            tracing::debug!("no commit hash: {}", e);
            COMMIT_UNKNOWN.to_string()
        }
    }
}

/// Resolve version and commit, skipping the tag lookup when a version is forced.
pub fn version_info(
    runner: &dyn CommandRunner,
    config: &Config,
    forced_version: Option<&str>,
) -> VersionInfo {
    let version = match forced_version {
        Some(v) => v.to_string(),
        None => version(runner, config),
    };
    VersionInfo::new(version, commit(runner))
}

/// Expand `{{.Version}}` and `{{.Commit}}` in a user linker flag.
pub fn expand_ldflag_templates(flag: &str, info: &VersionInfo) -> String {
    flag.replace("{{.Version}}", &info.version)
        .replace("{{.Commit}}", &info.commit)
}

/// Compose compiler flags from configuration and resolved version metadata.
///
/// Order: `-tags`, `-ldflags`, `-trimpath`, `-v`, then user toolchain flags.
pub fn compose_flags(config: &Config, info: &VersionInfo) -> CompileFlags {
    let build = &config.build;
    let mut flags = Vec::new();

    let tags: Vec<&str> = build
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if !tags.is_empty() {
        flags.push("-tags".to_string());
        flags.push(tags.join(","));
    }

    let mut ldflags = vec![
        format!("-X {}={}", config.version_var(), info.version),
        format!("-X {}={}", config.commit_var(), info.commit),
    ];
    ldflags.extend(
        build
            .ldflags
            .iter()
            .map(|f| expand_ldflag_templates(f, info)),
    );
    if !build.debug {
        ldflags.push("-s".to_string());
        ldflags.push("-w".to_string());
    }
    flags.push("-ldflags".to_string());
    flags.push(ldflags.join(" "));

    if build.trimpath {
        flags.push("-trimpath".to_string());
    }
    if build.verbose {
        flags.push("-v".to_string());
    }

    flags.extend(build.goflags.iter().cloned());

    CompileFlags(flags)
}
