//! Test utilities and mocks for keel unit tests.
//!
//! The central piece is [`MockRunner`], a [`CommandRunner`] that records
//! every invocation and answers from a list of expectations instead of
//! spawning processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use keel::test_support::{CommandPattern, MockProcessOutput, MockRunner};
//!
//! #[test]
//! fn test_example() {
//!     let runner = MockRunner::new();
//!     runner.on(
//!         CommandPattern::exact("git", &["rev-parse", "--short", "HEAD"]),
//!         MockProcessOutput::success("abc1234\n"),
//!     );
//!
//!     // Hand `&runner` to the code under test, then inspect runner.calls()
//! }
//! ```

pub mod fixtures;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};

use crate::core::errors::BuildError;
use crate::util::memory::MemoryProbe;
use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::security;

pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Check if the process succeeded.
    pub fn success_status(&self) -> bool {
        self.status == 0
    }

    fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching command lines (`program arg1 arg2 ...`).
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command line.
    Exact(String),
    /// Match if command line starts with prefix.
    StartsWith(String),
    /// Match if command line contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

impl CommandPattern {
    pub fn exact(program: &str, args: &[&str]) -> Self {
        CommandPattern::Exact(command_line(program, args))
    }

    pub fn starts_with(program: &str, args: &[&str]) -> Self {
        CommandPattern::StartsWith(command_line(program, args))
    }

    pub fn contains(substring: &str) -> Self {
        CommandPattern::Contains(substring.to_string())
    }

    pub fn regex(pattern: &str) -> Self {
        CommandPattern::Regex(pattern.to_string())
    }

    /// Check if this pattern matches the given command line.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s.as_str()),
            CommandPattern::Contains(s) => cmd.contains(s.as_str()),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    /// Pattern to match against commands.
    pub pattern: CommandPattern,
    /// Output to return when matched.
    pub output: MockProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    /// Number of times this expectation has been used.
    pub used: usize,
}

impl CommandExpectation {
    /// Create a new expectation.
    pub fn new(pattern: CommandPattern, output: MockProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Check if this expectation can still be used.
    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

/// One invocation seen by a [`MockRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Working directory set on the invocation itself
    pub cwd: Option<PathBuf>,
}

impl RecordedCall {
    /// The command line as matched by [`CommandPattern`].
    pub fn command_line(&self) -> String {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        command_line(&self.program, &args)
    }

    /// First argument (the toolchain subcommand).
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// The argument following `flag`.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}

#[derive(Debug)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<RecordedCall>,
    default_output: Option<MockProcessOutput>,
}

/// Mock command runner for testing build orchestration.
///
/// Commands are validated like the real runner; rejected commands are not
/// recorded. Unmatched commands succeed with empty output unless
/// [`MockRunner::strict`] was called.
#[derive(Debug)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl Default for MockRunner {
    fn default() -> Self {
        MockRunner::new()
    }
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        MockRunner {
            state: Mutex::new(MockState {
                expectations: Vec::new(),
                calls: Vec::new(),
                default_output: Some(MockProcessOutput::default()),
            }),
        }
    }

    /// Fail commands that match no expectation.
    pub fn strict(self) -> Self {
        self.state.lock().unwrap().default_output = None;
        self
    }

    /// Answer commands matching `pattern` with `output`.
    pub fn on(&self, pattern: CommandPattern, output: MockProcessOutput) -> &Self {
        self.expect(CommandExpectation::new(pattern, output))
    }

    /// Add a custom expectation.
    pub fn expect(&self, expectation: CommandExpectation) -> &Self {
        self.state.lock().unwrap().expectations.push(expectation);
        self
    }

    /// Set the output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.state.lock().unwrap().default_output = Some(output);
        self
    }

    /// Get all commands that were called.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls to `program` whose first argument is `subcommand`.
    pub fn calls_to(&self, program: &str, subcommand: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program && c.subcommand() == Some(subcommand))
            .collect()
    }

    /// Command lines of all calls, for readable assertions.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::command_line).collect()
    }

    /// Clear all recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        for (i, exp) in state.expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} ({:?}) was used {} times, expected {}",
                        i,
                        exp.pattern,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }

    fn respond(&self, cmd: &ProcessBuilder) -> Result<String, BuildError> {
        security::validate_command(cmd.get_program(), cmd.get_args())?;

        let call = RecordedCall {
            program: cmd.get_program().to_string(),
            args: cmd.get_args().to_vec(),
            env: ["GOOS", "GOARCH"]
                .iter()
                .filter_map(|k| cmd.get_env(k).map(|v| (k.to_string(), v.to_string())))
                .collect(),
            cwd: cmd.get_cwd().map(PathBuf::from),
        };
        let line = call.command_line();

        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        let matched = state
            .expectations
            .iter_mut()
            .find(|exp| exp.available() && exp.pattern.matches(&line))
            .map(|exp| {
                exp.used += 1;
                exp.output.clone()
            });

        let output = match matched.or_else(|| state.default_output.clone()) {
            Some(output) => output,
            None => {
                return Err(BuildError::CommandFailed {
                    command: line.clone(),
                    status: None,
                    output: String::new(),
                    source: Some(std::io::Error::other(format!("unexpected command: {}", line))),
                })
            }
        };

        if output.success_status() {
            Ok(output.combined())
        } else {
            Err(BuildError::CommandFailed {
                command: cmd.display_command(),
                status: Some(output.status),
                output: output.combined(),
                source: None,
            })
        }
    }
}

impl CommandRunner for MockRunner {
    fn run_cmd(&self, cmd: &ProcessBuilder) -> Result<(), BuildError> {
        self.respond(cmd).map(|_| ())
    }

    fn run_cmd_output(&self, cmd: &ProcessBuilder) -> Result<String, BuildError> {
        self.respond(cmd)
    }
}

/// Memory probe returning a fixed reading, or failing when `None`.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemory(pub Option<u64>);

impl FixedMemory {
    pub fn megabytes(mb: u64) -> Self {
        FixedMemory(Some(mb * 1024 * 1024))
    }

    pub fn unavailable() -> Self {
        FixedMemory(None)
    }
}

impl MemoryProbe for FixedMemory {
    fn available_bytes(&self) -> Result<u64> {
        self.0.ok_or_else(|| anyhow!("memory statistics unavailable"))
    }
}

/// Create a temporary directory for a test project.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

/// Write a fixture into a fresh temporary directory.
pub fn temp_project(fixture: &GoProjectFixture) -> (tempfile::TempDir, PathBuf) {
    let tmp = temp_dir();
    let root = fixture.write_to(tmp.path()).unwrap();
    (tmp, root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_pattern_matching() {
        let line = "go build -p 1 ./pkg/a ./pkg/b";

        assert!(CommandPattern::exact("go", &["build", "-p", "1", "./pkg/a", "./pkg/b"]).matches(line));
        assert!(CommandPattern::starts_with("go", &["build"]).matches(line));
        assert!(!CommandPattern::starts_with("go", &["list"]).matches(line));
        assert!(CommandPattern::contains("./pkg/b").matches(line));
        assert!(CommandPattern::regex(r"^go build .*pkg/a").matches(line));
        assert!(!CommandPattern::regex("[invalid").matches(line));
        assert!(CommandPattern::Any.matches(line));
    }

    #[test]
    fn test_mock_runner_records_calls() {
        let runner = MockRunner::new();
        runner.on(
            CommandPattern::exact("git", &["rev-parse", "--short", "HEAD"]),
            MockProcessOutput::success("abc1234\n"),
        );

        let out = runner
            .run_cmd_output(&ProcessBuilder::new("git").args(["rev-parse", "--short", "HEAD"]))
            .unwrap();
        assert_eq!(out, "abc1234\n");

        runner
            .run_cmd(
                &ProcessBuilder::new("go")
                    .args(["build", "."])
                    .env("GOOS", "linux"),
            )
            .unwrap();

        runner
            .run_cmd(&ProcessBuilder::new("go").args(["build", "./..."]).cwd("/src/mono/api"))
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].subcommand(), Some("build"));
        assert_eq!(calls[1].env("GOOS"), Some("linux"));
        assert_eq!(calls[1].cwd, None);
        assert_eq!(calls[2].cwd.as_deref(), Some(std::path::Path::new("/src/mono/api")));
        assert_eq!(runner.calls_to("go", "build").len(), 2);
    }

    #[test]
    fn test_mock_runner_failure_output() {
        let runner = MockRunner::new();
        runner.on(
            CommandPattern::starts_with("go", &["build"]),
            MockProcessOutput::failure(2, "undefined: x"),
        );

        let err = runner
            .run_cmd(&ProcessBuilder::new("go").args(["build", "."]))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::CommandFailed {
                status: Some(2),
                ..
            }
        ));
        assert!(err.to_string().contains("undefined: x"));
    }

    #[test]
    fn test_mock_runner_strict_and_times() {
        let runner = MockRunner::new().strict();
        runner.expect(
            CommandExpectation::new(
                CommandPattern::starts_with("go", &["version"]),
                MockProcessOutput::success("go version go1.22.0 linux/amd64"),
            )
            .times(1),
        );

        let version = ProcessBuilder::new("go").arg("version");
        runner.run_cmd(&version).unwrap();
        assert!(runner.verify().is_ok());
        assert!(runner.run_cmd(&version).is_err());
    }

    #[test]
    fn test_mock_runner_validates_like_real_runner() {
        let runner = MockRunner::new();
        let err = runner
            .run_cmd(&ProcessBuilder::new("go").args(["build", "-o", "../escape", "."]))
            .unwrap_err();

        assert!(matches!(err, BuildError::UnsafeInput { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_fixed_memory() {
        assert_eq!(FixedMemory::megabytes(2).available_bytes().unwrap(), 2 * 1024 * 1024);
        assert!(FixedMemory::unavailable().available_bytes().is_err());
    }
}
