use crate::builder::discovery::{discover_packages_in, module_name, Workspace, ALL_PACKAGES};
use crate::builder::executor::{package_build_command, PackageBuildOptions};
use crate::core::errors::BuildError;
use crate::core::package::Package;
use crate::util::process::CommandRunner;

use super::StrategyOptions;

/// Build each workspace module from its own directory.
///
/// Building from the workspace root trips over modules that exist on disk
/// but are not listed in `go.work`, so every module gets its own
/// invocation. Modules named in `exclude_modules` or matching the exclude
/// filter are skipped.
pub(crate) fn build_workspace_modules(
    runner: &dyn CommandRunner,
    workspace: &Workspace,
    opts: &StrategyOptions,
    build_opts: &PackageBuildOptions,
) -> Result<(), BuildError> {
    let exclude = opts.exclude_filter();

    for dir in workspace.modules() {
        let name = module_name(dir);

        if opts.exclude_modules.iter().any(|m| *m == name) {
            tracing::info!("Skipping module {} (excluded from prebuild)", name);
            continue;
        }
        if let Some(ref filter) = exclude {
            if filter.matches(&name) {
                tracing::info!(
                    "Skipping module {} (matches exclude pattern: {})",
                    name,
                    filter.as_str()
                );
                continue;
            }
        }

        let targets: Vec<String> = match exclude {
            Some(ref filter) => match discover_packages_in(runner, dir, ALL_PACKAGES, Some(filter)) {
                Ok(packages) if packages.is_empty() => {
                    tracing::info!("No packages to build in {} after filtering", name);
                    continue;
                }
                Ok(packages) => packages
                    .iter()
                    .map(Package::import_path)
                    .map(String::from)
                    .collect(),
                Err(e) => {
                    tracing::warn!("Failed to discover packages in {}: {}", dir.display(), e);
                    vec![ALL_PACKAGES.to_string()]
                }
            },
            None => vec![ALL_PACKAGES.to_string()],
        };

        tracing::info!("Building packages in module {}", name);
        let cmd = package_build_command(&targets, build_opts).cwd(dir);
        runner
            .run_cmd(&cmd)
            .map_err(|e| BuildError::build_failed(format!("module {}", name), e))?;
    }
    Ok(())
}
