//! Package discovery through the toolchain's package lister.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde_json::Deserializer;

use crate::core::errors::BuildError;
use crate::core::package::{Package, PackageRecord};
use crate::util::config::Config;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Pattern matching every package in the module.
pub const ALL_PACKAGES: &str = "./...";

/// Packages to leave out of a build, by glob or substring.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    raw: String,
    glob: Option<glob::Pattern>,
}

impl ExcludeFilter {
    /// Build a filter; returns `None` for an empty pattern.
    pub fn new(pattern: &str) -> Option<Self> {
        let raw = pattern.trim();
        if raw.is_empty() {
            return None;
        }
        Some(ExcludeFilter {
            raw: raw.to_string(),
            glob: glob::Pattern::new(raw).ok(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the import path should be excluded.
    pub fn matches(&self, import_path: &str) -> bool {
        import_path.contains(&self.raw)
            || self
                .glob
                .as_ref()
                .is_some_and(|g| g.matches(import_path))
    }
}

fn apply_exclude(packages: Vec<Package>, exclude: Option<&ExcludeFilter>) -> Vec<Package> {
    match exclude {
        Some(filter) => {
            let before = packages.len();
            let kept: Vec<Package> = packages
                .into_iter()
                .filter(|p| !filter.matches(p.import_path()))
                .collect();
            tracing::debug!(
                "excluded {} package(s) matching `{}`",
                before - kept.len(),
                filter.as_str()
            );
            kept
        }
        None => packages,
    }
}

/// Marker file of a multi-module workspace.
pub const WORKSPACE_FILE: &str = "go.work";

/// Module directories of a `go.work` workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    modules: Vec<PathBuf>,
}

impl Workspace {
    pub fn new(modules: Vec<PathBuf>) -> Self {
        Workspace { modules }
    }

    /// Detect workspace mode at `root`.
    ///
    /// Returns `None` without a `go.work` file, or when the module listing
    /// fails or is empty.
    pub fn detect(runner: &dyn CommandRunner, root: &Path) -> Option<Workspace> {
        if !root.join(WORKSPACE_FILE).is_file() {
            return None;
        }

        let list = ProcessBuilder::new("go").args(["list", "-m", "-f", "{{.Dir}}"]);
        let output = match runner.run_cmd_output(&list) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Failed to list workspace modules: {}", e);
                return None;
            }
        };

        let modules: Vec<PathBuf> = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect();
        if modules.is_empty() {
            return None;
        }
        tracing::debug!("workspace mode with {} module(s)", modules.len());
        Some(Workspace::new(modules))
    }

    pub fn modules(&self) -> &[PathBuf] {
        &self.modules
    }

    /// One `<module dir>/...` listing pattern per module.
    pub fn patterns(&self) -> Vec<String> {
        self.modules
            .iter()
            .map(|dir| dir.join("...").to_string_lossy().into_owned())
            .collect()
    }
}

/// Directory name of a workspace module, used for exclusion checks.
pub fn module_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string_lossy().into_owned())
}

/// Packages holding only tests, skipped by discovery.
fn is_test_only_package(import_path: &str) -> bool {
    import_path.contains("/test/") || import_path.contains("/tests/")
}

fn list_packages(
    runner: &dyn CommandRunner,
    list: &ProcessBuilder,
    pattern: &str,
) -> Result<Vec<Package>, BuildError> {
    let output = runner
        .run_cmd_output(list)
        .map_err(|e| BuildError::discovery_failed(pattern, e))?;

    Ok(output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_test_only_package(l))
        .map(Package::new)
        .collect())
}

/// List the packages matching `pattern`, one import path per output line.
pub fn discover_packages(
    runner: &dyn CommandRunner,
    pattern: &str,
    exclude: Option<&ExcludeFilter>,
) -> Result<Vec<Package>, BuildError> {
    let list = ProcessBuilder::new("go").args(["list", pattern]);
    let packages = list_packages(runner, &list, pattern)?;
    Ok(apply_exclude(packages, exclude))
}

/// Like [`discover_packages`], listing from inside `dir`.
pub fn discover_packages_in(
    runner: &dyn CommandRunner,
    dir: &Path,
    pattern: &str,
    exclude: Option<&ExcludeFilter>,
) -> Result<Vec<Package>, BuildError> {
    let list = ProcessBuilder::new("go").args(["list", pattern]).cwd(dir);
    let packages = list_packages(runner, &list, pattern)?;
    Ok(apply_exclude(packages, exclude))
}

/// Discover packages for a whole project.
///
/// In workspace mode each module is listed on its own and modules whose
/// listing fails are skipped; otherwise `pattern` is listed.
pub fn discover_project_packages(
    runner: &dyn CommandRunner,
    workspace: Option<&Workspace>,
    pattern: &str,
    exclude: Option<&ExcludeFilter>,
) -> Result<Vec<Package>, BuildError> {
    let Some(workspace) = workspace else {
        return discover_packages(runner, pattern, exclude);
    };

    let mut packages = Vec::new();
    for module_pattern in workspace.patterns() {
        let list = ProcessBuilder::new("go").args(["list", module_pattern.as_str()]);
        match list_packages(runner, &list, &module_pattern) {
            Ok(found) => packages.extend(found),
            Err(e) => tracing::debug!("skipping module {}: {}", module_pattern, e),
        }
    }
    if packages.is_empty() {
        return Err(BuildError::NoWorkspacePackages);
    }
    Ok(apply_exclude(packages, exclude))
}

/// Parse the concatenated JSON records printed by `go list -json`.
pub fn parse_package_stream(output: &str) -> Result<Vec<PackageRecord>, serde_json::Error> {
    Deserializer::from_str(output)
        .into_iter::<PackageRecord>()
        .collect()
}

/// List the entry-point packages matching `pattern`, in listing order.
pub fn find_main_packages(
    runner: &dyn CommandRunner,
    pattern: &str,
    exclude: Option<&ExcludeFilter>,
) -> Result<Vec<Package>, BuildError> {
    let list = ProcessBuilder::new("go").args(["list", "-json", pattern]);
    let output = runner
        .run_cmd_output(&list)
        .map_err(|e| BuildError::discovery_failed(pattern, e))?;

    let records = parse_package_stream(&output).map_err(|e| {
        BuildError::discovery_failed(
            pattern,
            BuildError::CommandFailed {
                command: list.display_command(),
                status: Some(0),
                output: format!("unparseable package listing: {}", e),
                source: None,
            },
        )
    })?;

    let mains = records
        .into_iter()
        .filter(PackageRecord::is_main)
        .map(Package::from)
        .collect();

    Ok(apply_exclude(mains, exclude))
}

/// Entry-point packages for a whole project.
///
/// In workspace mode each module is searched and modules that fail to
/// list are skipped.
pub fn find_project_main_packages(
    runner: &dyn CommandRunner,
    workspace: Option<&Workspace>,
    pattern: &str,
    exclude: Option<&ExcludeFilter>,
) -> Result<Vec<Package>, BuildError> {
    let Some(workspace) = workspace else {
        return find_main_packages(runner, pattern, exclude);
    };

    let mut mains = Vec::new();
    for module_pattern in workspace.patterns() {
        match find_main_packages(runner, &module_pattern, exclude) {
            Ok(found) => mains.extend(found),
            Err(e) => tracing::debug!("skipping module {}: {}", module_pattern, e),
        }
    }
    Ok(mains)
}

/// Whether a Go source file declares `package main`.
///
/// Only the first code on a line outside comments is inspected.
pub fn declares_main_package(file: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(file) else {
        return false;
    };

    let mut in_block_comment = false;
    for line in contents.lines() {
        let mut rest = line.trim();
        loop {
            if in_block_comment {
                match rest.find("*/") {
                    Some(end) => {
                        in_block_comment = false;
                        rest = rest[end + 2..].trim_start();
                    }
                    None => {
                        rest = "";
                        break;
                    }
                }
            }
            match rest.strip_prefix("/*") {
                Some(after) => {
                    in_block_comment = true;
                    rest = after;
                }
                None => break,
            }
        }

        if rest.is_empty() || rest.starts_with("//") {
            continue;
        }

        let mut words = rest.split_whitespace();
        let keyword = words.next();
        let name = words.next().and_then(|w| w.split('/').next());
        return keyword == Some("package") && name == Some("main");
    }
    false
}

fn dir_has_main_package(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(|e| e.ok()).any(|entry| {
        let path = entry.path();
        path.extension().is_some_and(|ext| ext == "go") && declares_main_package(&path)
    })
}

/// Normalize a configured main path to `./relative` form.
fn normalize_main_path(configured: &str) -> Result<String, BuildError> {
    let trimmed = configured.trim().trim_end_matches('/');
    let invalid = || BuildError::InvalidMainPath(configured.to_string());

    if trimmed.is_empty() || trimmed == "." || trimmed == "./" {
        return Ok(".".to_string());
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid());
    }

    let relative = trimmed.strip_prefix("./").unwrap_or(trimmed);
    Ok(format!("./{}", relative))
}

/// `./cmd/server/main.go` -> `./cmd/server`, `./main.go` -> `.`
fn package_dir(file: &str) -> &str {
    match file.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => ".",
    }
}

/// Resolve the package path to build a binary from.
///
/// Order: configured `project.main` (a file resolves to its directory),
/// then `main.go` at the root, then the
/// first `cmd/<name>/main.go` (by name) declaring `package main`. When
/// nothing is found, binary builds fail and other builds use `./...`.
pub fn detect_main_path(
    project_root: &Path,
    config: &Config,
    require_binary: bool,
) -> Result<String, BuildError> {
    if let Some(ref configured) = config.project.main {
        let normalized = normalize_main_path(configured)?;
        let target = project_root.join(&normalized);

        let package = if target.is_dir() {
            dir_has_main_package(&target).then_some(normalized)
        } else if target.extension().is_some_and(|ext| ext == "go") && declares_main_package(&target) {
            // build the whole package, not the single file
            Some(package_dir(&normalized).to_string())
        } else {
            None
        };
        return package.ok_or_else(|| BuildError::InvalidMainPath(configured.clone()));
    }

    if project_root.join("main.go").is_file() {
        return Ok(".".to_string());
    }

    let cmd_dir = project_root.join("cmd");
    if let Ok(entries) = fs::read_dir(&cmd_dir) {
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        for name in names {
            if declares_main_package(&cmd_dir.join(&name).join("main.go")) {
                return Ok(format!("./cmd/{}", name));
            }
        }
    }

    if require_binary {
        Err(BuildError::NoMainPackage)
    } else {
        Ok(ALL_PACKAGES.to_string())
    }
}
