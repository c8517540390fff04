//! Subprocess execution utilities.
//!
//! Every external process keel starts is described by a [`ProcessBuilder`]
//! and executed through a [`CommandRunner`]. The production runner,
//! [`SystemRunner`], validates the invocation before spawning it directly
//! from its argv (never through a shell).

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Instant;

use crate::core::errors::BuildError;
use crate::util::security;

/// Environment variable name prefixes never passed to child processes.
const SENSITIVE_ENV_PREFIXES: &[&str] = &[
    "AWS_SECRET",
    "GITHUB_TOKEN",
    "GITLAB_TOKEN",
    "NPM_TOKEN",
    "DOCKER_PASSWORD",
    "DATABASE_PASSWORD",
    "API_KEY",
    "SECRET",
    "PRIVATE_KEY",
];

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        ProcessBuilder {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable for this invocation only.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program name.
    pub fn get_program(&self) -> &str {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get an environment override, if set.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Get the working directory, if set.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Build the Command.
    fn build_command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.args);

        for (key, _) in std::env::vars_os() {
            if is_sensitive_env(&key.to_string_lossy()) {
                cmd.env_remove(&key);
            }
        }

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Spawn the process and wait for it, capturing stdout and stderr.
    ///
    /// No validation happens here; use a [`CommandRunner`] for that.
    pub fn exec(&self) -> Result<Output, BuildError> {
        let program = resolve_program(&self.program).map_err(|e| self.spawn_error(e))?;

        let mut cmd = self.build_command(&program);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output().map_err(|e| self.spawn_error(e))
    }

    fn spawn_error(&self, source: io::Error) -> BuildError {
        BuildError::CommandFailed {
            command: self.display_command(),
            status: None,
            output: String::new(),
            source: Some(source),
        }
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        parts.push(self.program.clone());
        parts.extend(self.args.iter().map(|a| {
            if a.contains(' ') {
                format!("\"{}\"", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

fn is_sensitive_env(name: &str) -> bool {
    let name = name.to_uppercase();
    SENSITIVE_ENV_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
    })
}

fn resolve_program(program: &str) -> io::Result<PathBuf> {
    let path = Path::new(program);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    find_executable(program).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("`{}` not found in PATH", program),
        )
    })
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Executes external commands on behalf of the build.
///
/// Implementations must not interpret arguments through a shell.
pub trait CommandRunner {
    /// Run a command, requiring success.
    fn run_cmd(&self, cmd: &ProcessBuilder) -> Result<(), BuildError>;

    /// Run a command and return its combined output, requiring success.
    fn run_cmd_output(&self, cmd: &ProcessBuilder) -> Result<String, BuildError>;

    /// Whether side effects are only being logged.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// The production runner: validates, then spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cwd: Option<PathBuf>,
    dry_run: bool,
}

impl SystemRunner {
    /// Create a runner that executes in the current directory.
    pub fn new() -> Self {
        SystemRunner::default()
    }

    /// Run every command from the given directory unless the command sets its own.
    pub fn working_dir(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Log side-effecting commands instead of running them.
    ///
    /// Output queries (`run_cmd_output`) still execute so that version and
    /// package information stay accurate.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn prepare(&self, cmd: &ProcessBuilder) -> Result<ProcessBuilder, BuildError> {
        security::validate_command(cmd.get_program(), cmd.get_args())?;

        let mut cmd = cmd.clone();
        if cmd.get_cwd().is_none() {
            if let Some(ref cwd) = self.cwd {
                cmd = cmd.cwd(cwd);
            }
        }
        Ok(cmd)
    }

    fn execute(&self, cmd: &ProcessBuilder) -> Result<Output, BuildError> {
        let start = Instant::now();
        let output = cmd.exec()?;

        tracing::debug!(
            command = %cmd.display_command(),
            exit_code = ?output.status.code(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "command finished"
        );

        if !output.status.success() {
            return Err(BuildError::CommandFailed {
                command: cmd.display_command(),
                status: output.status.code(),
                output: combined_output(&output),
                source: None,
            });
        }
        Ok(output)
    }
}

impl CommandRunner for SystemRunner {
    fn run_cmd(&self, cmd: &ProcessBuilder) -> Result<(), BuildError> {
        let cmd = self.prepare(cmd)?;

        if self.dry_run {
            tracing::info!("[dry run] {}", cmd.display_command());
            return Ok(());
        }

        tracing::debug!("running {}", cmd.display_command());
        let output = self.execute(&cmd)?;

        // Toolchain chatter (e.g. `-v` package names) is passed through.
        let text = combined_output(&output);
        if !text.trim().is_empty() {
            eprint!("{}", text);
        }
        Ok(())
    }

    fn run_cmd_output(&self, cmd: &ProcessBuilder) -> Result<String, BuildError> {
        let cmd = self.prepare(cmd)?;
        let output = self.execute(&cmd)?;
        Ok(combined_output(&output))
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
