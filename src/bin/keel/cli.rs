//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// keel - Build orchestration for Go projects
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print toolchain commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Run as if keel was started in <DIR>
    #[arg(short = 'C', value_name = "DIR", global = true)]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the project binary
    Build(BuildArgs),

    /// Remove built binaries and clear the test cache
    Clean,

    /// Install the binary into GOBIN
    Install,

    /// Install the binary stamped as a development build
    Dev,

    /// Run code generators across the module
    Generate,

    /// Tidy the module and compile every package
    Prebuild(PrebuildArgs),

    /// List supported and default target platforms
    Platforms,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Cross-compile for an os/arch pair (repeatable)
    #[arg(long, value_name = "OS/ARCH")]
    pub platform: Vec<String>,

    /// Build every configured platform (or the default set)
    #[arg(long, conflicts_with_all = ["platform", "linux", "darwin", "windows"])]
    pub all: bool,

    /// Build for linux/amd64
    #[arg(long)]
    pub linux: bool,

    /// Build for darwin/amd64 and darwin/arm64
    #[arg(long)]
    pub darwin: bool,

    /// Build for windows/amd64
    #[arg(long)]
    pub windows: bool,
}

impl BuildArgs {
    /// Whether any target selection was given.
    pub fn has_targets(&self) -> bool {
        self.all || self.linux || self.darwin || self.windows || !self.platform.is_empty()
    }
}

#[derive(Args)]
pub struct PrebuildArgs {
    /// Settings such as strategy=incremental batch=5 delay=200 exclude=*/mocks/*
    #[arg(value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
