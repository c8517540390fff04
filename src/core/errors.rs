//! Error taxonomy for build orchestration.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error returned by every build entry point.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    /// A program or argument was rejected before anything was spawned.
    #[error("unsafe input `{input}`: {reason}")]
    #[diagnostic(code(keel::exec::unsafe_input))]
    UnsafeInput { input: String, reason: String },

    /// An external process could not be spawned or exited unsuccessfully.
    #[error("`{command}` {}", failure_detail(.status, .output, .source))]
    #[diagnostic(code(keel::exec::command_failed))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("invalid platform format: `{0}` (expected os/arch, e.g. linux/amd64)")]
    #[diagnostic(code(keel::platform::invalid_format))]
    InvalidPlatformFormat(String),

    #[error("unsupported platform `{platform}`: {reason}")]
    #[diagnostic(code(keel::platform::unsupported))]
    UnsupportedPlatform { platform: String, reason: String },

    #[error("package discovery failed for `{pattern}`: {cause}")]
    #[diagnostic(code(keel::discovery::failed))]
    DiscoveryFailed {
        pattern: String,
        cause: Box<BuildError>,
    },

    #[error("no packages found in workspace modules")]
    #[diagnostic(code(keel::discovery::empty_workspace))]
    NoWorkspacePackages,

    /// A compiler invocation failed.
    #[error("build failed for {target}: {cause}")]
    #[diagnostic(code(keel::build::failed))]
    BuildFailed {
        target: String,
        cause: Box<BuildError>,
    },

    /// A non-compile toolchain step (install, generate, tidy, clean) failed.
    #[error("{step} failed: {cause}")]
    #[diagnostic(code(keel::build::step_failed))]
    StepFailed {
        step: &'static str,
        cause: Box<BuildError>,
    },

    #[error("no main package found for binary build")]
    #[diagnostic(code(keel::build::no_main))]
    NoMainPackage,

    #[error("configured main path `{0}` does not exist or is not a main package")]
    #[diagnostic(code(keel::build::invalid_main))]
    InvalidMainPath(String),

    #[error("failed to {action} `{}`: {source}", .path.display())]
    #[diagnostic(code(keel::io))]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn failure_detail(status: &Option<i32>, output: &str, source: &Option<io::Error>) -> String {
    let mut detail = match (source, status) {
        (Some(err), _) => format!("could not be run: {}", err),
        (None, Some(code)) => format!("exited with code {}", code),
        (None, None) => "was terminated by a signal".to_string(),
    };
    let output = output.trim();
    if !output.is_empty() {
        detail.push_str(":\n");
        detail.push_str(output);
    }
    detail
}

impl BuildError {
    /// Wrap a compiler failure for the given target.
    pub fn build_failed(target: impl Into<String>, cause: BuildError) -> Self {
        BuildError::BuildFailed {
            target: target.into(),
            cause: Box::new(cause),
        }
    }

    /// Wrap a failure of a non-compile toolchain step.
    pub fn step_failed(step: &'static str, cause: BuildError) -> Self {
        BuildError::StepFailed {
            step,
            cause: Box::new(cause),
        }
    }

    /// Wrap a package listing failure.
    pub fn discovery_failed(pattern: impl Into<String>, cause: BuildError) -> Self {
        BuildError::DiscoveryFailed {
            pattern: pattern.into(),
            cause: Box::new(cause),
        }
    }

    /// Build an `UnsafeInput` error.
    pub fn unsafe_input(input: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::UnsafeInput {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// The innermost error, following build/discovery/step wrappers.
    pub fn root_cause(&self) -> &BuildError {
        match self {
            BuildError::BuildFailed { cause, .. }
            | BuildError::DiscoveryFailed { cause, .. }
            | BuildError::StepFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self.root_cause() {
            BuildError::UnsafeInput { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Remove shell metacharacters from the configured flags or paths"),
            BuildError::CommandFailed {
                source: Some(_), ..
            } => Diagnostic::error(self.to_string()).with_suggestion(suggestions::NO_TOOLCHAIN),
            BuildError::CommandFailed { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::BUILD_FAILED)
            }
            BuildError::InvalidPlatformFormat(_) | BuildError::UnsupportedPlatform { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::LIST_PLATFORMS)
            }
            BuildError::NoMainPackage | BuildError::InvalidMainPath(_) => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::SET_MAIN)
            }
            BuildError::NoWorkspacePackages => Diagnostic::error(self.to_string())
                .with_context("workspace modules are listed with `go list -m` from go.work")
                .with_suggestion(suggestions::CHECK_WORKSPACE),
            _ => Diagnostic::error(self.to_string()),
        }
    }
}
